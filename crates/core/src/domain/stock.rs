use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Rendered in place of any metadata field the provider did not report.
pub const UNKNOWN: &str = "unknown";

/// Point-in-time company metadata. `None` means the provider omitted the
/// field; a reported zero stays `Some(0.0)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockInfo {
    pub name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub market_cap: Option<u64>,
    pub pe_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
}

impl StockInfo {
    /// Label/value pairs in display order, with missing values as [`UNKNOWN`].
    pub fn display_fields(&self) -> [(&'static str, String); 6] {
        [
            ("Company", or_unknown(self.name.as_ref())),
            ("Sector", or_unknown(self.sector.as_ref())),
            ("Industry", or_unknown(self.industry.as_ref())),
            ("Market Capitalization", or_unknown(self.market_cap.as_ref())),
            ("P/E Ratio", or_unknown(self.pe_ratio.as_ref())),
            ("Dividend Yield", or_unknown(self.dividend_yield.as_ref())),
        ]
    }
}

pub fn or_unknown<T: Display>(value: Option<&T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => UNKNOWN.to_string(),
    }
}

/// One OHLCV observation. Values the provider left null stay `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<FixedOffset>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub currency: Option<String>,
    pub exchange_timezone: Option<String>,
    pub rows: Vec<PriceBar>,
}

impl PriceSeries {
    /// Orders rows by timestamp ascending. Equal timestamps keep provider order.
    pub fn new(currency: Option<String>, exchange_timezone: Option<String>, mut rows: Vec<PriceBar>) -> Self {
        rows.sort_by_key(|r| r.timestamp);
        Self {
            currency,
            exchange_timezone,
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn latest_close(&self) -> Option<f64> {
        self.rows.iter().rev().find_map(|r| r.close)
    }
}

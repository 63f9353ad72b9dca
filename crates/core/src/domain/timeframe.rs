use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Historical window a selection asks for. Serialized as its provider code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeFrame {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
}

impl TimeFrame {
    pub const ALL: [TimeFrame; 5] = [
        TimeFrame::OneDay,
        TimeFrame::FiveDays,
        TimeFrame::OneMonth,
        TimeFrame::SixMonths,
        TimeFrame::OneYear,
    ];

    /// Range code understood by the market-data provider.
    pub fn code(self) -> &'static str {
        match self {
            TimeFrame::OneDay => "1d",
            TimeFrame::FiveDays => "5d",
            TimeFrame::OneMonth => "1mo",
            TimeFrame::SixMonths => "6mo",
            TimeFrame::OneYear => "1y",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeFrame::OneDay => "Past Day",
            TimeFrame::FiveDays => "Past Five Days",
            TimeFrame::OneMonth => "Past Month",
            TimeFrame::SixMonths => "6 Months",
            TimeFrame::OneYear => "1 Year",
        }
    }

    pub fn supported_codes() -> String {
        Self::ALL
            .iter()
            .map(|tf| tf.code())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedTimeFrame(pub String);

impl fmt::Display for UnsupportedTimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unsupported timeframe {:?}; choose one of {}.",
            self.0,
            TimeFrame::supported_codes()
        )
    }
}

impl std::error::Error for UnsupportedTimeFrame {}

impl FromStr for TimeFrame {
    type Err = UnsupportedTimeFrame;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Self::ALL
            .into_iter()
            .find(|tf| tf.code() == code)
            .ok_or_else(|| UnsupportedTimeFrame(code.to_string()))
    }
}

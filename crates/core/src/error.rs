use thiserror::Error;

/// Failure kinds surfaced by a selection.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StockError {
    /// Missing or unsupported input, detected before any external call.
    #[error("{0}")]
    Validation(String),

    /// The market-data provider has nothing for this ticker.
    #[error("no data available for {ticker}: {reason}")]
    DataUnavailable { ticker: String, reason: String },

    /// Transport or provider failure from either external service.
    #[error("{service} error: {detail}")]
    Upstream { service: &'static str, detail: String },
}

impl StockError {
    pub fn upstream(service: &'static str, err: &anyhow::Error) -> Self {
        StockError::Upstream {
            service,
            detail: format!("{err:#}"),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StockError::Validation(_) => "validation",
            StockError::DataUnavailable { .. } => "data_unavailable",
            StockError::Upstream { .. } => "upstream",
        }
    }
}

use crate::domain::{PriceSeries, StockInfo, TimeFrame};
use crate::error::StockError;

#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Metadata and the price series covering `time_frame`, requested serially.
    ///
    /// Fails with [`StockError::DataUnavailable`] when the provider knows
    /// nothing about `ticker`, and [`StockError::Upstream`] otherwise.
    async fn fetch(
        &self,
        ticker: &str,
        time_frame: TimeFrame,
    ) -> Result<(StockInfo, PriceSeries), StockError>;
}

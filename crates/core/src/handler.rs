use crate::config::Settings;
use crate::domain::{SessionState, TimeFrame};
use crate::error::StockError;
use crate::ingest::{MarketDataProvider, YahooFinanceClient};
use crate::llm::{self, LlmClient};
use crate::summary::SummaryGenerator;
use std::sync::Arc;

const MAX_TICKER_LEN: usize = 20;

/// Runs one user selection against the session state: validate, fetch, store,
/// summarize. Calls are serial and never retried.
#[derive(Clone)]
pub struct SelectionHandler {
    market: Arc<dyn MarketDataProvider>,
    summarizer: SummaryGenerator,
}

impl SelectionHandler {
    pub fn new(market: Arc<dyn MarketDataProvider>, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            market,
            summarizer: SummaryGenerator::new(llm),
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let market = Arc::new(YahooFinanceClient::from_settings(settings)?);
        let llm = llm::client_from_settings(settings)?;
        tracing::info!(
            market = market.provider_name(),
            llm = ?llm.provider(),
            model = llm.model(),
            "selection handler ready"
        );
        Ok(Self::new(market, llm))
    }

    /// Always leaves a `+`/`-` status message in `state`. The returned error
    /// only tells the caller which kind of failure it was.
    pub async fn handle_selection(
        &self,
        state: &mut SessionState,
        ticker: &str,
        time_frame: &str,
    ) -> Result<(), StockError> {
        let (ticker, time_frame) = match validate(ticker, time_frame) {
            Ok(v) => v,
            Err(err) => {
                tracing::debug!(error = %err, "rejected selection");
                state.fail(err.to_string());
                return Err(err);
            }
        };

        tracing::info!(ticker = %ticker, %time_frame, "handling stock selection");

        let (info, history) = match self.market.fetch(&ticker, time_frame).await {
            Ok(fetched) => fetched,
            Err(err) => {
                tracing::warn!(ticker = %ticker, %time_frame, error = %err, "market data fetch failed");
                state.fail(format!("Failed to retrieve data: {err}"));
                return Err(err);
            }
        };

        let info = state.apply_fetch(ticker.clone(), time_frame, info, history);
        let summarized = self.summarizer.summarize(info, &ticker).await;
        match summarized {
            Ok(summary) => {
                state.apply_summary(summary);
                tracing::info!(ticker = %ticker, %time_frame, "selection complete");
                Ok(())
            }
            Err(err) => {
                state.stock_summary.clear();
                state.fail(format!(
                    "Data for {ticker} was retrieved, but the summary could not be generated: {err}"
                ));
                Err(err)
            }
        }
    }
}

fn validate(ticker: &str, time_frame: &str) -> Result<(String, TimeFrame), StockError> {
    let ticker = ticker.trim();
    let time_frame = time_frame.trim();

    let missing = match (ticker.is_empty(), time_frame.is_empty()) {
        (true, true) => Some("Please provide both stock ticker and timeframe."),
        (true, false) => Some("Please provide a stock ticker."),
        (false, true) => Some("Please provide a timeframe."),
        (false, false) => None,
    };
    if let Some(msg) = missing {
        return Err(StockError::Validation(msg.to_string()));
    }

    if ticker.len() > MAX_TICKER_LEN || !ticker.chars().all(is_ticker_char) {
        return Err(StockError::Validation(format!(
            "Invalid stock ticker {ticker:?}."
        )));
    }

    let time_frame = time_frame
        .parse::<TimeFrame>()
        .map_err(|err| StockError::Validation(err.to_string()))?;

    Ok((ticker.to_ascii_uppercase(), time_frame))
}

// Covers forms like BRK-B, ^GSPC, 0700.HK and EURUSD=X.
fn is_ticker_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=')
}

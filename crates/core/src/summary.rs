use crate::domain::stock::or_unknown;
use crate::domain::StockInfo;
use crate::error::StockError;
use crate::llm::{ChatMessage, ChatRequest, LlmClient};
use std::sync::Arc;

const SERVICE: &str = "language model";

pub const SYSTEM_INSTRUCTION: &str = "You are an assistant that helps financial analysts with stock analysis based on the provided stock information";

/// Turns a metadata record into a free-text summary. Every call is a fresh
/// single-turn conversation.
#[derive(Clone)]
pub struct SummaryGenerator {
    llm: Arc<dyn LlmClient>,
}

impl SummaryGenerator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn summarize(&self, info: &StockInfo, ticker: &str) -> Result<String, StockError> {
        let req = ChatRequest {
            model: self.llm.model().to_string(),
            system: SYSTEM_INSTRUCTION.to_string(),
            messages: vec![ChatMessage::user(prompt(info, ticker))],
        };

        let summary = self.llm.complete(req).await.map_err(|err| {
            tracing::warn!(ticker, provider = ?self.llm.provider(), error = %err, "summary generation failed");
            StockError::upstream(SERVICE, &err)
        })?;

        tracing::debug!(ticker, chars = summary.len(), "generated summary");
        Ok(summary)
    }
}

pub fn prompt(info: &StockInfo, ticker: &str) -> String {
    format!(
        "Company: {}\n\
         Sector: {}\n\
         Industry: {}\n\
         Stock Ticker: {}\n\
         Market Capitalization: {}\n\
         P/E Ratio: {}\n\
         Dividend Yield: {}\n",
        or_unknown(info.name.as_ref()),
        or_unknown(info.sector.as_ref()),
        or_unknown(info.industry.as_ref()),
        ticker,
        or_unknown(info.market_cap.as_ref()),
        or_unknown(info.pe_ratio.as_ref()),
        or_unknown(info.dividend_yield.as_ref()),
    )
}

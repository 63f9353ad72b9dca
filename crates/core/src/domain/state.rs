use crate::domain::{PriceSeries, StockInfo, TimeFrame};
use serde::{Deserialize, Serialize};
use std::fmt;

const SUCCESS_PREFIX: char = '+';
const FAILURE_PREFIX: char = '-';

/// User-facing outcome of the last action: `+` for success, `-` for failure,
/// empty before the first action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusMessage(String);

impl StatusMessage {
    pub fn success(text: impl AsRef<str>) -> Self {
        Self(format!("{SUCCESS_PREFIX}{}", text.as_ref()))
    }

    pub fn failure(text: impl AsRef<str>) -> Self {
        Self(format!("{FAILURE_PREFIX}{}", text.as_ref()))
    }

    pub fn is_success(&self) -> bool {
        self.0.starts_with(SUCCESS_PREFIX)
    }

    pub fn is_failure(&self) -> bool {
        self.0.starts_with(FAILURE_PREFIX)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Message text with the prefix removed.
    pub fn text(&self) -> &str {
        self.0
            .strip_prefix(&[SUCCESS_PREFIX, FAILURE_PREFIX][..])
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the presentation layer renders for one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub selected_stock: String,
    pub time_frame: Option<TimeFrame>,
    pub stock_info: Option<StockInfo>,
    pub stock_history: Option<PriceSeries>,
    pub stock_summary: String,
    pub status_message: StatusMessage,
    pub stock_summary_visible: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failed action. The summary panel is hidden so it never shows
    /// next to a failure message.
    pub(crate) fn fail(&mut self, text: impl AsRef<str>) {
        self.status_message = StatusMessage::failure(text);
        self.stock_summary_visible = false;
    }

    pub(crate) fn apply_fetch(
        &mut self,
        ticker: String,
        time_frame: TimeFrame,
        info: StockInfo,
        history: PriceSeries,
    ) -> &StockInfo {
        self.selected_stock = ticker;
        self.time_frame = Some(time_frame);
        self.stock_history = Some(history);
        self.stock_info.insert(info)
    }

    pub(crate) fn apply_summary(&mut self, summary: String) {
        self.stock_summary = summary;
        self.status_message = StatusMessage::success(format!(
            "Data for {} has been retrieved successfully.",
            self.selected_stock
        ));
        self.stock_summary_visible = true;
    }
}

use crate::llm::Provider;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone)]
pub struct LlmDiagnosticsError {
    pub provider: Provider,
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
    pub raw_response_json: Option<Value>,
}

impl LlmDiagnosticsError {
    pub(crate) fn http(provider: Provider, status: reqwest::StatusCode, body: String) -> Self {
        let raw_response_json = serde_json::from_str::<Value>(&body).ok();
        let detail = match raw_response_json.as_ref().and_then(error_message) {
            Some(msg) => format!("status={status}, message={msg}"),
            None => format!("status={status}"),
        };
        Self {
            provider,
            stage: "http",
            detail,
            raw_output: Some(body),
            raw_response_json,
        }
    }
}

// Both Anthropic and OpenAI-style APIs report `{"error": {"message": ..}}`.
fn error_message(v: &Value) -> Option<String> {
    v.get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

impl fmt::Display for LlmDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LLM error (provider={:?}, stage={}): {}",
            self.provider, self.stage, self.detail
        )
    }
}

impl std::error::Error for LlmDiagnosticsError {}

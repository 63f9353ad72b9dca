pub mod anthropic;
pub mod error;
pub mod openai;

use crate::config::{LlmProviderKind, Settings};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAI,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A single stateless completion: one system instruction plus ordered turns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub model: String,
    pub system: String,
    pub messages: Vec<ChatMessage>,
}

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> Provider;

    /// Model identifier fixed at start-up from configuration.
    fn model(&self) -> &str;

    async fn complete(&self, req: ChatRequest) -> anyhow::Result<String>;
}

pub fn client_from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn LlmClient>> {
    Ok(match settings.llm_provider {
        LlmProviderKind::Anthropic => Arc::new(anthropic::AnthropicClient::from_settings(settings)?),
        LlmProviderKind::OpenAi => Arc::new(openai::OpenAiClient::from_settings(settings)?),
    })
}

pub mod domain;
pub mod error;
pub mod handler;
pub mod ingest;
pub mod llm;
pub mod summary;

#[cfg(test)]
mod test_support;

pub use error::StockError;
pub use handler::SelectionHandler;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum LlmProviderKind {
        Anthropic,
        OpenAi,
    }

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub llm_provider: LlmProviderKind,
        pub anthropic_api_key: Option<String>,
        pub openai_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub yahoo_base_url: Option<String>,
        pub yahoo_cookie_url: Option<String>,
        pub yahoo_user_agent: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let llm_provider = parse_llm_provider(std::env::var("LLM_PROVIDER").ok().as_deref())?;
            Ok(Self {
                llm_provider,
                anthropic_api_key: non_empty_var("ANTHROPIC_API_KEY"),
                openai_api_key: non_empty_var("OPENAI_API_KEY"),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
                yahoo_base_url: non_empty_var("YAHOO_BASE_URL"),
                yahoo_cookie_url: non_empty_var("YAHOO_COOKIE_URL"),
                yahoo_user_agent: non_empty_var("YAHOO_USER_AGENT"),
            })
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }

        pub fn require_openai_api_key(&self) -> anyhow::Result<&str> {
            self.openai_api_key
                .as_deref()
                .context("OPENAI_API_KEY is required")
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|s| !s.trim().is_empty())
    }

    pub(crate) fn parse_llm_provider(raw: Option<&str>) -> anyhow::Result<LlmProviderKind> {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("anthropic") => Ok(LlmProviderKind::Anthropic),
            Some("openai") | Some("writer") => Ok(LlmProviderKind::OpenAi),
            Some(other) => anyhow::bail!("unsupported LLM_PROVIDER {other:?} (expected anthropic or openai)"),
        }
    }

    /// Reads `key` as a number, falling back to `default` when unset or unparsable.
    pub(crate) fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
        std::env::var(key)
            .ok()
            .and_then(|s| s.parse::<T>().ok())
            .unwrap_or(default)
    }

}

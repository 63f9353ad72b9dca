use crate::config::{env_or, Settings};
use crate::domain::{PriceBar, PriceSeries, StockInfo, TimeFrame};
use crate::error::StockError;
use crate::ingest::provider::MarketDataProvider;
use crate::ingest::types::{
    ChartEnvelope, ChartResult, ProviderError, QuoteSummaryEnvelope, QuoteSummaryResult,
    YahooNumber,
};
use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use reqwest::{StatusCode, Url};
use std::time::Duration;

const SERVICE: &str = "market data";

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";
const DEFAULT_COOKIE_URL: &str = "https://fc.yahoo.com";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const SUMMARY_MODULES: &str = "price,assetProfile,summaryDetail";
const HISTORY_INTERVAL: &str = "1d";
const MAX_BODY_IN_ERROR: usize = 300;

#[derive(Debug)]
pub struct YahooFinanceClient {
    http: reqwest::Client,
    base_url: String,
    cookie_url: String,

    // quoteSummary needs a cookie-bound crumb. Issued once per process, dropped when rejected.
    crumb: tokio::sync::Mutex<Option<String>>,
}

impl YahooFinanceClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings
            .yahoo_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let cookie_url = settings
            .yahoo_cookie_url
            .clone()
            .unwrap_or_else(|| DEFAULT_COOKIE_URL.to_string());
        let user_agent = settings
            .yahoo_user_agent
            .as_deref()
            .unwrap_or(DEFAULT_USER_AGENT);
        let timeout_secs = env_or("YAHOO_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS);

        Self::new(
            base_url,
            cookie_url,
            user_agent,
            Duration::from_secs(timeout_secs),
        )
    }

    pub fn new(
        base_url: String,
        cookie_url: String,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .cookie_store(true)
            .build()
            .context("failed to build Yahoo http client")?;

        Ok(Self {
            http,
            base_url,
            cookie_url,
            crumb: tokio::sync::Mutex::new(None),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("invalid Yahoo base url: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|()| anyhow::anyhow!("Yahoo base url cannot take a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn crumb(&self) -> Result<String> {
        let mut guard = self.crumb.lock().await;
        if let Some(crumb) = guard.as_ref() {
            return Ok(crumb.clone());
        }

        // Any status is fine here; only the Set-Cookie header matters.
        self.http
            .get(&self.cookie_url)
            .send()
            .await
            .context("Yahoo cookie request failed")?;

        let url = self.endpoint(&["v1", "test", "getcrumb"])?;
        let (status, text) = self.get_text(url, &[], "crumb").await?;
        let crumb = text.trim();
        if !status.is_success() || crumb.is_empty() {
            anyhow::bail!("Yahoo crumb HTTP {status}: {}", truncate(&text));
        }

        tracing::debug!("issued Yahoo crumb");
        *guard = Some(crumb.to_string());
        Ok(crumb.to_string())
    }

    async fn get_text(
        &self,
        url: Url,
        query: &[(&str, &str)],
        what: &str,
    ) -> Result<(StatusCode, String)> {
        let res = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Yahoo {what} request failed"))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .with_context(|| format!("failed to read Yahoo {what} response"))?;
        Ok((status, text))
    }

    async fn fetch_info(&self, ticker: &str) -> Result<StockInfo, StockError> {
        let crumb = self.crumb().await.map_err(upstream)?;
        let url = self
            .endpoint(&["v10", "finance", "quoteSummary", ticker])
            .map_err(upstream)?;
        let (status, text) = self
            .get_text(
                url,
                &[("modules", SUMMARY_MODULES), ("crumb", crumb.as_str())],
                "quoteSummary",
            )
            .await
            .map_err(upstream)?;

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(ticker, "Yahoo rejected the crumb; a new one is issued on the next fetch");
            *self.crumb.lock().await = None;
        }

        decode_summary(ticker, status, &text)
    }

    async fn fetch_history(
        &self,
        ticker: &str,
        time_frame: TimeFrame,
    ) -> Result<PriceSeries, StockError> {
        let url = self
            .endpoint(&["v8", "finance", "chart", ticker])
            .map_err(upstream)?;
        let (status, text) = self
            .get_text(
                url,
                &[("range", time_frame.code()), ("interval", HISTORY_INTERVAL)],
                "chart",
            )
            .await
            .map_err(upstream)?;

        decode_chart(ticker, status, &text)
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for YahooFinanceClient {
    fn provider_name(&self) -> &'static str {
        "yahoo_finance"
    }

    async fn fetch(
        &self,
        ticker: &str,
        time_frame: TimeFrame,
    ) -> Result<(StockInfo, PriceSeries), StockError> {
        let info = self.fetch_info(ticker).await?;
        let history = self.fetch_history(ticker, time_frame).await?;
        tracing::info!(ticker, %time_frame, rows = history.len(), "fetched Yahoo market data");
        Ok((info, history))
    }
}

fn upstream(err: anyhow::Error) -> StockError {
    StockError::upstream(SERVICE, &err)
}

fn truncate(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX_BODY_IN_ERROR {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(MAX_BODY_IN_ERROR).collect();
    out.push_str("...");
    out
}

fn unavailable(ticker: &str, reason: impl Into<String>) -> StockError {
    StockError::DataUnavailable {
        ticker: ticker.to_string(),
        reason: reason.into(),
    }
}

fn http_failure(ticker: &str, status: StatusCode, text: &str) -> StockError {
    if status == StatusCode::NOT_FOUND {
        return unavailable(ticker, format!("HTTP {status}"));
    }
    StockError::Upstream {
        service: SERVICE,
        detail: format!("HTTP {status}: {}", truncate(text)),
    }
}

fn provider_failure(ticker: &str, status: StatusCode, err: &ProviderError) -> StockError {
    if err.is_not_found() || status == StatusCode::NOT_FOUND {
        return unavailable(ticker, err.describe());
    }
    StockError::Upstream {
        service: SERVICE,
        detail: format!("HTTP {status}: {}", err.describe()),
    }
}

fn undecodable(
    ticker: &str,
    status: StatusCode,
    text: &str,
    what: &str,
    err: serde_json::Error,
) -> StockError {
    if !status.is_success() {
        return http_failure(ticker, status, text);
    }
    StockError::Upstream {
        service: SERVICE,
        detail: format!("failed to parse Yahoo {what} response: {err}"),
    }
}

pub(crate) fn decode_summary(
    ticker: &str,
    status: StatusCode,
    text: &str,
) -> Result<StockInfo, StockError> {
    let body = match serde_json::from_str::<QuoteSummaryEnvelope>(text) {
        Ok(envelope) => envelope.quote_summary,
        Err(err) => return Err(undecodable(ticker, status, text, "quoteSummary", err)),
    };

    if let Some(err) = body.error.as_ref() {
        return Err(provider_failure(ticker, status, err));
    }
    if !status.is_success() {
        return Err(http_failure(ticker, status, text));
    }

    let result = body
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| unavailable(ticker, "quoteSummary returned no result"))?;
    Ok(info_from_summary(result))
}

fn info_from_summary(result: QuoteSummaryResult) -> StockInfo {
    let price = result.price.unwrap_or_default();
    let profile = result.asset_profile.unwrap_or_default();
    let detail = result.summary_detail.unwrap_or_default();

    let market_cap = number(price.market_cap.as_ref())
        .or_else(|| number(detail.market_cap.as_ref()))
        .filter(|v| *v >= 0.0)
        .map(|v| v.round() as u64);

    StockInfo {
        name: text_field(price.long_name),
        sector: text_field(profile.sector),
        industry: text_field(profile.industry),
        market_cap,
        pe_ratio: number(detail.trailing_pe.as_ref()),
        dividend_yield: number(detail.dividend_yield.as_ref()),
    }
}

fn number(n: Option<&YahooNumber>) -> Option<f64> {
    n.and_then(YahooNumber::value)
}

fn text_field(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

pub(crate) fn decode_chart(
    ticker: &str,
    status: StatusCode,
    text: &str,
) -> Result<PriceSeries, StockError> {
    let body = match serde_json::from_str::<ChartEnvelope>(text) {
        Ok(envelope) => envelope.chart,
        Err(err) => return Err(undecodable(ticker, status, text, "chart", err)),
    };

    if let Some(err) = body.error.as_ref() {
        return Err(provider_failure(ticker, status, err));
    }
    if !status.is_success() {
        return Err(http_failure(ticker, status, text));
    }

    let result = body
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| unavailable(ticker, "chart returned no result"))?;
    let series = series_from_chart(result).map_err(upstream)?;
    if series.is_empty() {
        return Err(unavailable(ticker, "no price history in the requested range"));
    }
    Ok(series)
}

fn series_from_chart(result: ChartResult) -> Result<PriceSeries> {
    let offset = result
        .meta
        .gmtoffset
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix());
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let mut rows = Vec::with_capacity(result.timestamp.len());
    for (i, &secs) in result.timestamp.iter().enumerate() {
        let timestamp = DateTime::from_timestamp(secs, 0)
            .with_context(|| format!("chart timestamp out of range: {secs}"))?
            .with_timezone(&offset);
        rows.push(PriceBar {
            timestamp,
            open: column(&quote.open, i),
            high: column(&quote.high, i),
            low: column(&quote.low, i),
            close: column(&quote.close, i),
            volume: column(&quote.volume, i)
                .filter(|v| *v >= 0.0)
                .map(|v| v.round() as u64),
        });
    }

    Ok(PriceSeries::new(
        result.meta.currency,
        result.meta.exchange_timezone_name,
        rows,
    ))
}

fn column(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmProviderKind;
    use crate::test_support::MockServer;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn summary_fixture() -> serde_json::Value {
        json!({
            "quoteSummary": {
                "result": [{
                    "price": {
                        "longName": "Apple Inc.",
                        "marketCap": {"raw": 3_450_000_000_000u64, "fmt": "3.45T"}
                    },
                    "assetProfile": {
                        "sector": "Technology",
                        "industry": "Consumer Electronics"
                    },
                    "summaryDetail": {
                        "trailingPE": {"raw": 34.2, "fmt": "34.20"},
                        "dividendYield": {"raw": 0.0044, "fmt": "0.44%"}
                    }
                }],
                "error": null
            }
        })
    }

    fn chart_fixture() -> serde_json::Value {
        json!({
            "chart": {
                "result": [{
                    "meta": {
                        "currency": "USD",
                        "exchangeTimezoneName": "America/New_York",
                        "gmtoffset": -14400
                    },
                    "timestamp": [1_717_507_800i64, 1_717_594_200i64],
                    "indicators": {
                        "quote": [{
                            "open": [194.6, null],
                            "high": [195.3, 196.9],
                            "low": [193.0, 194.1],
                            "close": [194.35, 195.87],
                            "volume": [47_471_400u64, null]
                        }]
                    }
                }],
                "error": null
            }
        })
    }

    #[test]
    fn decodes_summary_into_metadata() {
        let text = summary_fixture().to_string();
        let info = decode_summary("AAPL", StatusCode::OK, &text).unwrap();
        assert_eq!(info.name.as_deref(), Some("Apple Inc."));
        assert_eq!(info.sector.as_deref(), Some("Technology"));
        assert_eq!(info.industry.as_deref(), Some("Consumer Electronics"));
        assert_eq!(info.market_cap, Some(3_450_000_000_000));
        assert_eq!(info.pe_ratio, Some(34.2));
        assert_eq!(info.dividend_yield, Some(0.0044));
    }

    #[test]
    fn missing_summary_fields_stay_unknown() {
        let text = json!({
            "quoteSummary": {
                "result": [{
                    "price": {"longName": "  ", "marketCap": {}},
                    "summaryDetail": {
                        "trailingPE": {"raw": "Infinity", "fmt": "∞"},
                        "dividendYield": {"raw": 0.0, "fmt": "0.00%"}
                    }
                }],
                "error": null
            }
        })
        .to_string();

        let info = decode_summary("XYZ", StatusCode::OK, &text).unwrap();
        assert_eq!(info.name, None);
        assert_eq!(info.sector, None);
        assert_eq!(info.industry, None);
        assert_eq!(info.market_cap, None);
        assert_eq!(info.pe_ratio, None);
        assert_eq!(info.dividend_yield, Some(0.0));
    }

    #[test]
    fn falls_back_to_summary_detail_market_cap() {
        let text = json!({
            "quoteSummary": {
                "result": [{"summaryDetail": {"marketCap": {"raw": 12345.0}}}],
                "error": null
            }
        })
        .to_string();
        let info = decode_summary("XYZ", StatusCode::OK, &text).unwrap();
        assert_eq!(info.market_cap, Some(12345));
    }

    #[test]
    fn unknown_ticker_is_data_unavailable() {
        let text = json!({
            "quoteSummary": {
                "result": null,
                "error": {"code": "Not Found", "description": "Quote not found for symbol: ZZZZ999"}
            }
        })
        .to_string();

        let err = decode_summary("ZZZZ999", StatusCode::NOT_FOUND, &text).unwrap_err();
        assert_eq!(
            err,
            StockError::DataUnavailable {
                ticker: "ZZZZ999".to_string(),
                reason: "Quote not found for symbol: ZZZZ999".to_string(),
            }
        );
    }

    #[test]
    fn server_errors_are_upstream() {
        let err = decode_summary("AAPL", StatusCode::BAD_GATEWAY, "<html>bad gateway</html>")
            .unwrap_err();
        match err {
            StockError::Upstream { service, detail } => {
                assert_eq!(service, "market data");
                assert!(detail.starts_with("HTTP 502 Bad Gateway"));
                assert!(detail.contains("bad gateway"));
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[test]
    fn invalid_crumb_is_upstream_not_unavailable() {
        let text = json!({
            "quoteSummary": {
                "result": null,
                "error": {"code": "Unauthorized", "description": "Invalid Crumb"}
            }
        })
        .to_string();
        let err = decode_summary("AAPL", StatusCode::UNAUTHORIZED, &text).unwrap_err();
        assert_eq!(err.kind(), "upstream");
        assert!(err.to_string().contains("Invalid Crumb"));
    }

    #[test]
    fn decodes_chart_rows_with_gaps() {
        let text = chart_fixture().to_string();

        let series = decode_chart("AAPL", StatusCode::OK, &text).unwrap();
        assert_eq!(series.currency.as_deref(), Some("USD"));
        assert_eq!(series.exchange_timezone.as_deref(), Some("America/New_York"));
        assert_eq!(series.len(), 2);

        let first = &series.rows[0];
        assert_eq!(first.timestamp.timestamp(), 1_717_507_800);
        assert_eq!(first.timestamp.offset().local_minus_utc(), -14400);
        assert_eq!(first.open, Some(194.6));
        assert_eq!(first.volume, Some(47_471_400));

        let second = &series.rows[1];
        assert_eq!(second.open, None);
        assert_eq!(second.close, Some(195.87));
        assert_eq!(second.volume, None);
    }

    #[test]
    fn empty_chart_is_data_unavailable() {
        let text = json!({
            "chart": {
                "result": [{"meta": {"currency": "USD"}, "indicators": {"quote": [{}]}}],
                "error": null
            }
        })
        .to_string();
        let err = decode_chart("AAPL", StatusCode::OK, &text).unwrap_err();
        assert_eq!(err.kind(), "data_unavailable");
    }

    #[test]
    fn delisted_chart_is_data_unavailable() {
        let text = json!({
            "chart": {
                "result": null,
                "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}
            }
        })
        .to_string();
        let err = decode_chart("ZZZZ999", StatusCode::NOT_FOUND, &text).unwrap_err();
        assert!(err.to_string().contains("symbol may be delisted"));
    }

    #[test]
    fn endpoint_escapes_the_ticker_segment() {
        let client = YahooFinanceClient::new(
            "http://localhost:9000/".to_string(),
            DEFAULT_COOKIE_URL.to_string(),
            DEFAULT_USER_AGENT,
            Duration::from_secs(1),
        )
        .unwrap();
        let url = client.endpoint(&["v8", "finance", "chart", "BRK/B"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/v8/finance/chart/BRK%2FB");
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "x".repeat(1000);
        let out = truncate(&body);
        assert_eq!(out.len(), MAX_BODY_IN_ERROR + 3);
        assert!(out.ends_with("..."));
    }

    const SUMMARY_QUERY: &str = "modules=price%2CassetProfile%2CsummaryDetail";

    fn yahoo_route(line: &str) -> (u16, String) {
        if line.starts_with("GET /v1/test/getcrumb") {
            (200, "crumbX".to_string())
        } else if line.starts_with("GET /v10/finance/quoteSummary/AAPL") {
            (200, summary_fixture().to_string())
        } else if line.starts_with("GET /v8/finance/chart/AAPL") {
            (200, chart_fixture().to_string())
        } else if line.starts_with("GET /v10/finance/quoteSummary/") {
            let body = json!({
                "quoteSummary": {
                    "result": null,
                    "error": {"code": "Not Found", "description": "Quote not found"}
                }
            });
            (404, body.to_string())
        } else {
            (200, String::new())
        }
    }

    fn client_at(server: &MockServer) -> YahooFinanceClient {
        YahooFinanceClient::new(
            server.base_url.clone(),
            format!("{}/cookie", server.base_url),
            "stockbrief-test",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn fetch_runs_crumb_handshake_once_then_reuses_it() {
        let server = MockServer::start(yahoo_route);
        let client = client_at(&server);

        let (info, history) = client.fetch("AAPL", TimeFrame::OneMonth).await.unwrap();
        assert_eq!(info.name.as_deref(), Some("Apple Inc."));
        assert_eq!(history.len(), 2);
        client.fetch("AAPL", TimeFrame::FiveDays).await.unwrap();

        assert_eq!(
            server.lines(),
            vec![
                "GET /cookie".to_string(),
                "GET /v1/test/getcrumb".to_string(),
                format!("GET /v10/finance/quoteSummary/AAPL?{SUMMARY_QUERY}&crumb=crumbX"),
                "GET /v8/finance/chart/AAPL?range=1mo&interval=1d".to_string(),
                format!("GET /v10/finance/quoteSummary/AAPL?{SUMMARY_QUERY}&crumb=crumbX"),
                "GET /v8/finance/chart/AAPL?range=5d&interval=1d".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn rejected_crumb_is_reissued_on_next_fetch() {
        let issued = AtomicUsize::new(0);
        let server = MockServer::start(move |line| {
            if line.starts_with("GET /v1/test/getcrumb") {
                let crumb = match issued.fetch_add(1, Ordering::SeqCst) {
                    0 => "stale",
                    _ => "fresh",
                };
                (200, crumb.to_string())
            } else if line.contains("crumb=stale") {
                let body = json!({
                    "quoteSummary": {
                        "result": null,
                        "error": {"code": "Unauthorized", "description": "Invalid Crumb"}
                    }
                });
                (401, body.to_string())
            } else {
                yahoo_route(line)
            }
        });
        let client = client_at(&server);

        let err = client.fetch("AAPL", TimeFrame::OneDay).await.unwrap_err();
        assert_eq!(err.kind(), "upstream");
        client.fetch("AAPL", TimeFrame::OneDay).await.unwrap();

        assert_eq!(
            server.lines(),
            vec![
                "GET /cookie".to_string(),
                "GET /v1/test/getcrumb".to_string(),
                format!("GET /v10/finance/quoteSummary/AAPL?{SUMMARY_QUERY}&crumb=stale"),
                "GET /cookie".to_string(),
                "GET /v1/test/getcrumb".to_string(),
                format!("GET /v10/finance/quoteSummary/AAPL?{SUMMARY_QUERY}&crumb=fresh"),
                "GET /v8/finance/chart/AAPL?range=1d&interval=1d".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn unknown_ticker_stops_before_history_request() {
        let server = MockServer::start(yahoo_route);
        let err = client_at(&server)
            .fetch("ZZZZ999", TimeFrame::OneYear)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "data_unavailable");
        assert!(!server
            .lines()
            .iter()
            .any(|line| line.contains("/v8/finance/chart")));
    }

    #[tokio::test]
    async fn from_settings_uses_configured_endpoints_and_agent() {
        let server = MockServer::start(yahoo_route);
        let settings = Settings {
            llm_provider: LlmProviderKind::Anthropic,
            anthropic_api_key: None,
            openai_api_key: None,
            sentry_dsn: None,
            yahoo_base_url: Some(server.base_url.clone()),
            yahoo_cookie_url: Some(format!("{}/cookie", server.base_url)),
            yahoo_user_agent: Some("stockbrief/custom".to_string()),
        };

        let client = YahooFinanceClient::from_settings(&settings).unwrap();
        client.fetch("AAPL", TimeFrame::SixMonths).await.unwrap();

        let seen = server.requests();
        assert_eq!(seen[0].line, "GET /cookie");
        assert!(seen
            .iter()
            .all(|r| r.header("user-agent") == Some("stockbrief/custom")));
    }
}

//! Fact-check providers.
//!
//! Two [`FactChecker`] implementations:
//! - **[`StubFactChecker`]**: waits a fixed simulated latency, then answers
//!   from the rule table in [`pagecheck_core::factcheck`].
//! - **[`HttpFactChecker`]**: POSTs `{ "text": ... }` to a remote endpoint
//!   speaking the same result schema (e.g. another server's
//!   `/api/fact-check`), with timeout, retry, and backoff.
//!
//! Use [`create_checker`] to pick one from configuration.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use pagecheck_core::factcheck::{lookup, FactCheckError, FactCheckResult, FactChecker};

use crate::config::FactCheckConfig;

/// Rule-table checker with a simulated response delay.
#[derive(Debug, Clone)]
pub struct StubFactChecker {
    latency: Duration,
}

impl StubFactChecker {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    pub fn from_config(config: &FactCheckConfig) -> Self {
        Self::new(Duration::from_millis(config.latency_ms))
    }
}

#[async_trait]
impl FactChecker for StubFactChecker {
    fn name(&self) -> &str {
        "stub"
    }

    async fn check(&self, text: &str) -> Result<FactCheckResult, FactCheckError> {
        if text.trim().is_empty() {
            return Err(FactCheckError::EmptyText);
        }
        tokio::time::sleep(self.latency).await;
        Ok(lookup(text))
    }
}

/// Remote fact-check service client.
pub struct HttpFactChecker {
    client: reqwest::Client,
    endpoint: String,
    max_retries: u32,
}

impl HttpFactChecker {
    pub fn new(endpoint: impl Into<String>, timeout: Duration, max_retries: u32) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            max_retries,
        })
    }

    pub fn from_config(config: &FactCheckConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| anyhow::anyhow!("fact_check.endpoint required for http provider"))?;
        Self::new(
            endpoint,
            Duration::from_secs(config.timeout_secs),
            config.max_retries,
        )
    }
}

#[async_trait]
impl FactChecker for HttpFactChecker {
    fn name(&self) -> &str {
        "http"
    }

    async fn check(&self, text: &str) -> Result<FactCheckResult, FactCheckError> {
        if text.trim().is_empty() {
            return Err(FactCheckError::EmptyText);
        }

        let body = serde_json::json!({ "text": text });
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tracing::warn!(
                    attempt,
                    delay_secs = delay.as_secs(),
                    "retrying fact-check request"
                );
                tokio::time::sleep(delay).await;
            }

            let resp = self.client.post(&self.endpoint).json(&body).send().await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return response
                            .json::<FactCheckResult>()
                            .await
                            .map_err(|e| FactCheckError::Unavailable(e.to_string()));
                    }

                    let body_text = response.text().await.unwrap_or_default();

                    // Rate limited or server error, retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(FactCheckError::Unavailable(format!(
                            "fact-check service error {}: {}",
                            status, body_text
                        )));
                        continue;
                    }

                    // Client error (not 429), fail now
                    return Err(FactCheckError::Rejected(format!("{}: {}", status, body_text)));
                }
                Err(e) => {
                    last_err = Some(FactCheckError::Unavailable(e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            FactCheckError::Unavailable("fact-check failed after retries".to_string())
        }))
    }
}

/// Builds the configured fact checker.
pub fn create_checker(config: &FactCheckConfig) -> Result<Arc<dyn FactChecker>> {
    match config.provider.as_str() {
        "stub" => Ok(Arc::new(StubFactChecker::from_config(config))),
        "http" => Ok(Arc::new(HttpFactChecker::from_config(config)?)),
        other => bail!("Unknown fact-check provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_stub_waits_latency_then_answers() {
        let checker = StubFactChecker::new(Duration::from_millis(1500));
        let started = tokio::time::Instant::now();
        let result = checker
            .check("Water boils at 100 degrees Celsius at sea level.")
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(1500));
        assert!(result.is_factual);
        assert_eq!(result.confidence, 0.98);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stub_rejects_blank_without_waiting() {
        let checker = StubFactChecker::new(Duration::from_secs(60));
        let started = tokio::time::Instant::now();
        assert!(matches!(
            checker.check(" \n\t").await,
            Err(FactCheckError::EmptyText)
        ));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_create_checker_by_provider() {
        let mut config = FactCheckConfig::default();
        assert_eq!(create_checker(&config).unwrap().name(), "stub");

        config.provider = "http".to_string();
        assert!(create_checker(&config).is_err());

        config.endpoint = Some("http://127.0.0.1:9/api/fact-check".to_string());
        assert_eq!(create_checker(&config).unwrap().name(), "http");
    }

    #[tokio::test]
    async fn test_http_checker_unreachable_is_unavailable() {
        // Port 9 (discard) is closed on test machines; connection is refused.
        let checker =
            HttpFactChecker::new("http://127.0.0.1:9/api/fact-check", Duration::from_secs(2), 0)
                .unwrap();
        let err = checker.check("The earth is flat").await.unwrap_err();
        assert!(err.is_retryable(), "expected retryable error, got {err}");
    }
}

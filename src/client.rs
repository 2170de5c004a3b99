//! HTTP client for a remote page server.
//!
//! [`HttpPageStore`] implements [`PageStore`] over the JSON API served by
//! [`server`](crate::server), so an editor session can persist to a remote
//! backend exactly as it would to a local store. Error responses are mapped
//! back to the same [`StoreError`] variants the server produced; transport
//! failures become [`StoreError::Unavailable`].

use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;

use pagecheck_core::error::{StoreError, StoreResult};
use pagecheck_core::models::Page;
use pagecheck_core::store::{validate_id, PageStore};

use crate::config::ClientConfig;

pub struct HttpPageStore {
    client: reqwest::Client,
    pages_url: String,
}

impl HttpPageStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            pages_url: format!("{}/api/pages", base_url.trim_end_matches('/')),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    fn page_url(&self, id: &str) -> String {
        format!("{}/{}", self.pages_url, id)
    }
}

fn transport(err: reqwest::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

/// Rebuilds a [`StoreError`] from an error response.
///
/// Understands both `{"error": {"code", "message"}}` and a bare
/// `{"error": "message"}`; without a code the status decides.
fn error_from_response(status: StatusCode, body: Option<serde_json::Value>) -> StoreError {
    let error = body.as_ref().and_then(|b| b.get("error"));
    let code = error
        .and_then(|e| e.get("code"))
        .and_then(|c| c.as_str());
    let message = error
        .and_then(|e| e.get("message").and_then(|m| m.as_str()).or_else(|| e.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| status.to_string());

    if let Some(code) = code {
        return StoreError::from_code(code, message);
    }
    match status {
        StatusCode::NOT_FOUND => StoreError::NotFound(message),
        StatusCode::BAD_REQUEST => StoreError::Validation(message),
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY | StatusCode::GATEWAY_TIMEOUT => {
            StoreError::Unavailable(message)
        }
        _ => StoreError::Internal(message),
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> StoreResult<T> {
    let status = resp.status();
    if status.is_success() {
        return resp
            .json::<T>()
            .await
            .map_err(|e| StoreError::Internal(format!("malformed response: {}", e)));
    }
    let body = resp.json::<serde_json::Value>().await.ok();
    Err(error_from_response(status, body))
}

#[async_trait]
impl PageStore for HttpPageStore {
    async fn create(&self, content: Option<serde_json::Value>) -> StoreResult<Page> {
        let resp = self
            .client
            .post(&self.pages_url)
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await
            .map_err(transport)?;
        decode(resp).await
    }

    async fn get(&self, id: &str) -> StoreResult<Page> {
        let id = validate_id(id)?;
        let resp = self
            .client
            .get(self.page_url(&id))
            .send()
            .await
            .map_err(transport)?;
        decode(resp).await
    }

    async fn update(&self, id: &str, content: Option<serde_json::Value>) -> StoreResult<Page> {
        let id = validate_id(id)?;
        let resp = self
            .client
            .put(self.page_url(&id))
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await
            .map_err(transport)?;
        decode(resp).await
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let id = validate_id(id)?;
        let resp = self
            .client
            .delete(self.page_url(&id))
            .send()
            .await
            .map_err(transport)?;
        decode::<serde_json::Value>(resp).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_structured_error_code_wins() {
        let err = error_from_response(
            StatusCode::BAD_REQUEST,
            Some(json!({"error": {"code": "invalid_id", "message": "invalid page id: x"}})),
        );
        assert!(matches!(err, StoreError::InvalidId(m) if m == "invalid page id: x"));
    }

    #[test]
    fn test_bare_error_string_falls_back_to_status() {
        let err = error_from_response(
            StatusCode::NOT_FOUND,
            Some(json!({"error": "Page not found"})),
        );
        assert!(matches!(err, StoreError::NotFound(m) if m == "Page not found"));
    }

    #[test]
    fn test_no_body() {
        assert!(matches!(
            error_from_response(StatusCode::SERVICE_UNAVAILABLE, None),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            error_from_response(StatusCode::INTERNAL_SERVER_ERROR, None),
            StoreError::Internal(_)
        ));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let store = HttpPageStore::new("http://localhost:3001/", Duration::from_secs(1)).unwrap();
        assert_eq!(store.page_url("abc"), "http://localhost:3001/api/pages/abc");
    }

    #[tokio::test]
    async fn test_malformed_id_rejected_locally() {
        let store = HttpPageStore::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        assert!(matches!(
            store.get("../health").await,
            Err(StoreError::InvalidId(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        let store = HttpPageStore::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = store.create(Some(json!({}))).await.unwrap_err();
        assert!(err.is_retryable());
    }
}

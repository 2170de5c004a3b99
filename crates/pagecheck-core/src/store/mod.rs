//! Storage abstraction for pages.
//!
//! The [`PageStore`] trait is the whole persistence contract: four CRUD
//! operations over a single collection of [`Page`]s. Backends are pluggable
//! (in-memory here, SQLite and HTTP in the `pagecheck` crate).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::Page;

/// Abstract page store.
///
/// # Operations
///
/// | Method | Purpose | Errors |
/// |--------|---------|--------|
/// | [`create`](PageStore::create) | Persist new content under a fresh id | `Validation` |
/// | [`get`](PageStore::get) | Read a page | `InvalidId`, `NotFound` |
/// | [`update`](PageStore::update) | Replace content wholesale | `InvalidId`, `NotFound`, `Validation` |
/// | [`delete`](PageStore::delete) | Remove a page | `InvalidId`, `NotFound` |
///
/// `update` must leave `updated_at` strictly greater than its previous
/// value. `delete` is not idempotent: a second call fails with `NotFound`.
#[async_trait]
pub trait PageStore: Send + Sync {
    async fn create(&self, content: Option<serde_json::Value>) -> StoreResult<Page>;

    async fn get(&self, id: &str) -> StoreResult<Page>;

    async fn update(&self, id: &str, content: Option<serde_json::Value>) -> StoreResult<Page>;

    async fn delete(&self, id: &str) -> StoreResult<()>;
}

/// Generates a new page id (hyphenated lowercase UUID v4).
pub fn new_page_id() -> String {
    Uuid::new_v4().to_string()
}

/// Checks that `id` is a well-formed page id and returns its canonical form.
pub fn validate_id(id: &str) -> StoreResult<String> {
    Uuid::parse_str(id)
        .map(|u| u.to_string())
        .map_err(|_| StoreError::InvalidId(id.to_string()))
}

/// Rejects absent or `null` content.
pub fn require_content(content: Option<serde_json::Value>) -> StoreResult<serde_json::Value> {
    match content {
        Some(serde_json::Value::Null) | None => {
            Err(StoreError::Validation("content is required".to_string()))
        }
        Some(value) => Ok(value),
    }
}

//! In-memory [`PageStore`] implementation for testing and embedded use.
//!
//! Uses a `HashMap` behind `std::sync::RwLock`. Every operation takes the
//! lock once, so each call is atomic with respect to the others.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Duration;

use crate::error::{StoreError, StoreResult};
use crate::models::{now_millis, Page};

use super::{new_page_id, require_content, validate_id, PageStore};

pub struct InMemoryPageStore {
    pages: RwLock<HashMap<String, Page>>,
}

impl InMemoryPageStore {
    pub fn new() -> Self {
        Self {
            pages: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.pages.read().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryPageStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Internal("page map lock poisoned".to_string())
}

#[async_trait]
impl PageStore for InMemoryPageStore {
    async fn create(&self, content: Option<serde_json::Value>) -> StoreResult<Page> {
        let content = require_content(content)?;
        let now = now_millis();
        let page = Page {
            id: new_page_id(),
            content,
            created_at: now,
            updated_at: now,
        };
        let mut pages = self.pages.write().map_err(poisoned)?;
        pages.insert(page.id.clone(), page.clone());
        Ok(page)
    }

    async fn get(&self, id: &str) -> StoreResult<Page> {
        let id = validate_id(id)?;
        let pages = self.pages.read().map_err(poisoned)?;
        pages.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    async fn update(&self, id: &str, content: Option<serde_json::Value>) -> StoreResult<Page> {
        let id = validate_id(id)?;
        let content = require_content(content)?;
        let mut pages = self.pages.write().map_err(poisoned)?;
        let page = pages.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        // Two updates inside the same millisecond still advance the clock.
        let floor = page.updated_at + Duration::milliseconds(1);
        page.updated_at = now_millis().max(floor);
        page.content = content;
        Ok(page.clone())
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let id = validate_id(id)?;
        let mut pages = self.pages.write().map_err(poisoned)?;
        pages
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_then_get_roundtrips_content() {
        let store = InMemoryPageStore::new();
        let content = json!({"html": "<p>hi</p>", "text": "hi", "annotations": []});
        let created = store.create(Some(content.clone())).await.unwrap();
        assert_eq!(created.created_at, created.updated_at);

        let fetched = store.get(&created.id).await.unwrap();
        assert_eq!(fetched.content, content);
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_create_requires_content() {
        let store = InMemoryPageStore::new();
        assert!(matches!(
            store.create(None).await,
            Err(StoreError::Validation(_))
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_update_replaces_and_advances_timestamp() {
        let store = InMemoryPageStore::new();
        let created = store.create(Some(json!({"text": "a"}))).await.unwrap();

        let first = store
            .update(&created.id, Some(json!({"text": "b"})))
            .await
            .unwrap();
        let second = store
            .update(&created.id, Some(json!({"html": "<p>c</p>"})))
            .await
            .unwrap();

        assert!(first.updated_at > created.updated_at);
        assert!(second.updated_at > first.updated_at);
        assert_eq!(second.created_at, created.created_at);
        assert_eq!(
            store.get(&created.id).await.unwrap().content,
            json!({"html": "<p>c</p>"})
        );
    }

    #[tokio::test]
    async fn test_update_checks_id_before_content() {
        let store = InMemoryPageStore::new();
        assert!(matches!(
            store.update("nope", None).await,
            Err(StoreError::InvalidId(_))
        ));
        assert!(matches!(
            store.update(&new_page_id(), Some(json!({}))).await,
            Err(StoreError::NotFound(_))
        ));
        let created = store.create(Some(json!({}))).await.unwrap();
        assert!(matches!(
            store.update(&created.id, None).await,
            Err(StoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_is_not_idempotent() {
        let store = InMemoryPageStore::new();
        let created = store.create(Some(json!({}))).await.unwrap();
        store.delete(&created.id).await.unwrap();
        assert!(matches!(
            store.get(&created.id).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.delete(&created.id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_id_is_invalid_everywhere() {
        let store = InMemoryPageStore::new();
        assert!(matches!(store.get("x").await, Err(StoreError::InvalidId(_))));
        assert!(matches!(
            store.delete("x").await,
            Err(StoreError::InvalidId(_))
        ));
    }
}

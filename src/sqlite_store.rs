//! SQLite-backed [`PageStore`] implementation.
//!
//! Each operation is a single SQL statement against the `pages` table
//! created by [`migrate`](crate::migrate). Content is stored as JSON text,
//! timestamps as unix milliseconds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use pagecheck_core::error::{StoreError, StoreResult};
use pagecheck_core::models::{now_millis, Page};
use pagecheck_core::store::{new_page_id, require_content, validate_id, PageStore};

pub struct SqlitePageStore {
    pool: SqlitePool,
}

impl SqlitePageStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Connection-level failures are retryable; everything else is internal.
fn map_sqlx(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(err.to_string())
        }
        other => StoreError::Internal(other.to_string()),
    }
}

fn from_millis(ms: i64) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::Internal(format!("timestamp out of range: {}", ms)))
}

fn row_to_page(row: &SqliteRow) -> StoreResult<Page> {
    let content: String = row.try_get("content").map_err(map_sqlx)?;
    Ok(Page {
        id: row.try_get("id").map_err(map_sqlx)?,
        content: serde_json::from_str(&content)
            .map_err(|e| StoreError::Internal(format!("stored content is not JSON: {}", e)))?,
        created_at: from_millis(row.try_get("created_at").map_err(map_sqlx)?)?,
        updated_at: from_millis(row.try_get("updated_at").map_err(map_sqlx)?)?,
    })
}

fn encode(content: &serde_json::Value) -> StoreResult<String> {
    serde_json::to_string(content).map_err(|e| StoreError::Validation(e.to_string()))
}

#[async_trait]
impl PageStore for SqlitePageStore {
    async fn create(&self, content: Option<serde_json::Value>) -> StoreResult<Page> {
        let content = require_content(content)?;
        let encoded = encode(&content)?;
        let id = new_page_id();
        let now = now_millis();

        sqlx::query("INSERT INTO pages (id, content, created_at, updated_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(&encoded)
            .bind(now.timestamp_millis())
            .bind(now.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        Ok(Page {
            id,
            content,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get(&self, id: &str) -> StoreResult<Page> {
        let id = validate_id(id)?;
        let row = sqlx::query("SELECT id, content, created_at, updated_at FROM pages WHERE id = ?")
            .bind(&id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;

        match row {
            Some(row) => row_to_page(&row),
            None => Err(StoreError::NotFound(id)),
        }
    }

    async fn update(&self, id: &str, content: Option<serde_json::Value>) -> StoreResult<Page> {
        let id = validate_id(id)?;
        let content = require_content(content)?;
        let encoded = encode(&content)?;

        // MAX(..., updated_at + 1) keeps updated_at strictly increasing even
        // when two writes land in the same millisecond.
        let row = sqlx::query(
            r#"
            UPDATE pages
            SET content = ?, updated_at = MAX(?, updated_at + 1)
            WHERE id = ?
            RETURNING id, content, created_at, updated_at
            "#,
        )
        .bind(&encoded)
        .bind(now_millis().timestamp_millis())
        .bind(&id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        match row {
            Some(row) => row_to_page(&row),
            None => Err(StoreError::NotFound(id)),
        }
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let id = validate_id(id)?;
        let result = sqlx::query("DELETE FROM pages WHERE id = ?")
            .bind(&id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::{db, migrate};
    use serde_json::json;
    use tempfile::TempDir;

    async fn test_store(tmp: &TempDir) -> SqlitePageStore {
        let mut cfg = Config::default();
        cfg.db.path = tmp.path().join("pages.sqlite");
        let pool = db::connect(&cfg).await.unwrap();
        migrate::migrate_pool(&pool).await.unwrap();
        SqlitePageStore::new(pool)
    }

    #[tokio::test]
    async fn test_crud_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp).await;
        let content = json!({"html": "<p>a</p>", "text": "a", "annotations": []});

        let created = store.create(Some(content.clone())).await.unwrap();
        assert_eq!(created.created_at, created.updated_at);
        assert_eq!(store.get(&created.id).await.unwrap(), created);

        let updated = store
            .update(&created.id, Some(json!({"text": "b"})))
            .await
            .unwrap();
        assert_eq!(updated.content, json!({"text": "b"}));
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);

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
    async fn test_same_millisecond_updates_stay_ordered() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp).await;
        let page = store.create(Some(json!({}))).await.unwrap();

        let mut last = page.updated_at;
        for i in 0..10 {
            let p = store.update(&page.id, Some(json!({ "n": i }))).await.unwrap();
            assert!(p.updated_at > last);
            last = p.updated_at;
        }
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp).await;

        assert!(matches!(store.create(None).await, Err(StoreError::Validation(_))));
        assert!(matches!(
            store.get("nope").await,
            Err(StoreError::InvalidId(_))
        ));
        assert!(matches!(
            store
                .update("00000000-0000-4000-8000-000000000000", Some(json!({})))
                .await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_survives_reconnect() {
        let tmp = TempDir::new().unwrap();
        let id = {
            let store = test_store(&tmp).await;
            let id = store.create(Some(json!({"text": "kept"}))).await.unwrap().id;
            store.pool().close().await;
            id
        };
        let store = test_store(&tmp).await;
        assert_eq!(store.get(&id).await.unwrap().content["text"], "kept");
    }
}

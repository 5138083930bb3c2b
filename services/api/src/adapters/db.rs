//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `StoryStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};
use std::time::Duration;
use storywriter_core::domain::{NewStoryRecord, StoryHistoryItem, StoryOptions};
use storywriter_core::ports::{PortError, PortResult, StoryStore};
use tracing::warn;
use uuid::Uuid;

/// Upper bound for the liveness query behind `is_connected`.
const PING_TIMEOUT: Duration = Duration::from_secs(2);

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `StoryStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct StoryRecord {
    id: Uuid,
    options: Json<StoryOptions>,
    content: String,
    snippet: String,
    created_at: DateTime<Utc>,
}
impl StoryRecord {
    fn to_domain(self) -> StoryHistoryItem {
        StoryHistoryItem {
            id: self.id.to_string(),
            created_at: self.created_at,
            options: self.options.0,
            content: self.content,
            snippet: self.snippet,
        }
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    match e {
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
            PortError::Unavailable(e.to_string())
        }
        _ => PortError::Unexpected(e.to_string()),
    }
}

//=========================================================================================
// `StoryStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl StoryStore for DbAdapter {
    async fn is_connected(&self) -> bool {
        if self.pool.is_closed() {
            return false;
        }
        let ping = sqlx::query("SELECT 1").execute(&self.pool);
        match tokio::time::timeout(PING_TIMEOUT, ping).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                warn!("Database ping failed: {}", e);
                false
            }
            Err(_) => {
                warn!("Database ping timed out after {:?}", PING_TIMEOUT);
                false
            }
        }
    }

    async fn list_stories(&self, user_id: &str, limit: i64) -> PortResult<Vec<StoryHistoryItem>> {
        let records = sqlx::query_as::<_, StoryRecord>(
            "SELECT id, options, content, snippet, created_at FROM stories WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn create_story(&self, record: NewStoryRecord) -> PortResult<StoryHistoryItem> {
        let created = sqlx::query_as::<_, StoryRecord>(
            "INSERT INTO stories (id, user_id, options, content, snippet) VALUES ($1, $2, $3, $4, $5) RETURNING id, options, content, snippet, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(record.user_id.trim())
        .bind(Json(&record.options))
        .bind(record.content.trim())
        .bind(record.snippet.trim())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(created.to_domain())
    }

    async fn delete_story(&self, user_id: &str, id: &str) -> PortResult<()> {
        // Ids that are not UUIDs can never match a row.
        let story_id = Uuid::parse_str(id)
            .map_err(|_| PortError::NotFound("Story not found".to_string()))?;

        let result = sqlx::query("DELETE FROM stories WHERE id = $1 AND user_id = $2")
            .bind(story_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound("Story not found".to_string()));
        }
        Ok(())
    }

    async fn clear_stories(&self, user_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM stories WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    fn unreachable_pool() -> PgPool {
        PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(500))
            .connect_lazy("postgres://storywriter@127.0.0.1:9/storywriter")
            .unwrap()
    }

    #[tokio::test]
    async fn unreachable_database_is_reported_disconnected() {
        let adapter = DbAdapter::new(unreachable_pool());
        assert!(!adapter.is_connected().await);
    }

    #[tokio::test]
    async fn closed_pool_is_reported_disconnected() {
        let pool = unreachable_pool();
        pool.close().await;
        assert!(!DbAdapter::new(pool).is_connected().await);
    }

    #[tokio::test]
    async fn outage_surfaces_as_unavailable() {
        let adapter = DbAdapter::new(unreachable_pool());
        let err = adapter.list_stories("user-1", 50).await.unwrap_err();
        assert!(matches!(err, PortError::Unavailable(_)));
    }
}

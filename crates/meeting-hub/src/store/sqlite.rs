//! SQLite-backed meeting store.
//!
//! # Security
//!
//! - All queries use parameterized statements (SQL injection safe)
//! - The connection URL is never logged

use super::MeetingStore;
use crate::errors::HubError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

/// Maximum pool size for file-backed databases.
const MAX_CONNECTIONS: u32 = 5;

const CREATE_MEETINGS_TABLE: &str = "CREATE TABLE IF NOT EXISTS meetings (
    meeting_id TEXT PRIMARY KEY NOT NULL,
    created_at INTEGER NOT NULL
)";

/// Meeting records in a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteMeetingStore {
    pool: SqlitePool,
}

impl SqliteMeetingStore {
    /// Open (creating if missing) the database at `url` and ensure the schema.
    pub async fn connect(url: &str) -> Result<Self, HubError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        // Every connection to `:memory:` is its own database, so keep exactly one alive.
        let in_memory = url.contains(":memory:");
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { MAX_CONNECTIONS })
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(if in_memory { None } else { Some(Duration::from_secs(600)) })
            .max_lifetime(if in_memory { None } else { Some(Duration::from_secs(1800)) })
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool and ensure the schema.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, HubError> {
        sqlx::query(CREATE_MEETINGS_TABLE).execute(&pool).await?;
        info!(target: "hub.store", "Meeting store ready");
        Ok(Self { pool })
    }

    /// Whether a meeting record exists.
    #[instrument(skip_all, fields(meeting_id = %meeting_id))]
    pub async fn meeting_exists(&self, meeting_id: &str) -> Result<bool, HubError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT meeting_id FROM meetings WHERE meeting_id = ?1")
                .bind(meeting_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    /// Number of stored meetings.
    pub async fn count(&self) -> Result<i64, HubError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM meetings")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl MeetingStore for SqliteMeetingStore {
    #[instrument(skip_all, name = "hub.store.create_meeting", fields(meeting_id = %meeting_id))]
    async fn create_meeting(&self, meeting_id: &str) -> Result<(), HubError> {
        sqlx::query("INSERT INTO meetings (meeting_id, created_at) VALUES (?1, ?2)")
            .bind(meeting_id)
            .bind(chrono::Utc::now().timestamp())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip_all, name = "hub.store.delete_meeting", fields(meeting_id = %meeting_id))]
    async fn delete_meeting(&self, meeting_id: &str) -> Result<(), HubError> {
        sqlx::query("DELETE FROM meetings WHERE meeting_id = ?1")
            .bind(meeting_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), HubError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    async fn memory_store() -> SqliteMeetingStore {
        SqliteMeetingStore::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_delete_meeting() {
        let store = memory_store().await;

        store.create_meeting("m-1").await.unwrap();
        assert!(store.meeting_exists("m-1").await.unwrap());
        assert_eq!(store.count().await.unwrap(), 1);

        store.delete_meeting("m-1").await.unwrap();
        assert!(!store.meeting_exists("m-1").await.unwrap());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_meeting_is_store_error() {
        let store = memory_store().await;
        store.create_meeting("m-1").await.unwrap();

        let result = store.create_meeting("m-1").await;
        assert!(matches!(result, Err(HubError::Store(_))));
    }

    #[tokio::test]
    async fn test_delete_unknown_meeting_succeeds() {
        let store = memory_store().await;
        assert!(store.delete_meeting("never-created").await.is_ok());
    }

    #[tokio::test]
    async fn test_schema_creation_is_idempotent() {
        let store = memory_store().await;
        store.create_meeting("m-1").await.unwrap();

        let reopened = SqliteMeetingStore::from_pool(store.pool.clone())
            .await
            .unwrap();
        assert!(reopened.meeting_exists("m-1").await.unwrap());
        assert!(reopened.ping().await.is_ok());
    }
}

//! Check history repository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::Result;
use crate::database::models::CheckHistoryDbModel;
use crate::database::time::now_ms;
use crate::domain::{CheckHistoryEntry, CheckResult};

/// History repository trait. Entries are never updated.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Append an entry and return its id.
    async fn add(
        &self,
        channel_id: &str,
        result: CheckResult,
        details: &serde_json::Value,
        duration_ms: u64,
    ) -> Result<String>;

    /// Most recent entries first.
    async fn list_for_channel(&self, channel_id: &str, limit: u32)
    -> Result<Vec<CheckHistoryEntry>>;
}

/// SQLx implementation of HistoryRepository.
pub struct SqlxHistoryRepository {
    pool: SqlitePool,
}

impl SqlxHistoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryRepository for SqlxHistoryRepository {
    async fn add(
        &self,
        channel_id: &str,
        result: CheckResult,
        details: &serde_json::Value,
        duration_ms: u64,
    ) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO check_history (id, channel_id, result, details, duration_ms, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(channel_id)
        .bind(result.as_str())
        .bind(serde_json::to_string(details)?)
        .bind(i64::try_from(duration_ms).unwrap_or(i64::MAX))
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn list_for_channel(
        &self,
        channel_id: &str,
        limit: u32,
    ) -> Result<Vec<CheckHistoryEntry>> {
        let rows = sqlx::query_as::<_, CheckHistoryDbModel>(
            "SELECT * FROM check_history WHERE channel_id = ? ORDER BY created_at DESC, rowid DESC LIMIT ?",
        )
        .bind(channel_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(CheckHistoryEntry::try_from).collect()
    }
}

//! Channel status repository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::Result;
use crate::database::models::ChannelStatusDbModel;
use crate::domain::ChannelStatus;

/// Status repository trait.
#[async_trait]
pub trait StatusRepository: Send + Sync {
    /// Overwrite the current status of a channel.
    async fn upsert(&self, status: &ChannelStatus) -> Result<()>;
    async fn get_status(&self, channel_id: &str) -> Result<Option<ChannelStatus>>;
}

/// SQLx implementation of StatusRepository.
pub struct SqlxStatusRepository {
    pool: SqlitePool,
}

impl SqlxStatusRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatusRepository for SqlxStatusRepository {
    async fn upsert(&self, status: &ChannelStatus) -> Result<()> {
        let model = ChannelStatusDbModel::from(status);
        sqlx::query(
            r#"
            INSERT INTO channel_status (
                channel_id, is_live, is_online, session_id, stream_url, stream_format,
                last_http_code, last_error_code, last_error_message, last_checked_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(channel_id) DO UPDATE SET
                is_live = excluded.is_live,
                is_online = excluded.is_online,
                session_id = excluded.session_id,
                stream_url = excluded.stream_url,
                stream_format = excluded.stream_format,
                last_http_code = excluded.last_http_code,
                last_error_code = excluded.last_error_code,
                last_error_message = excluded.last_error_message,
                last_checked_at = excluded.last_checked_at
            "#,
        )
        .bind(&model.channel_id)
        .bind(model.is_live)
        .bind(model.is_online)
        .bind(&model.session_id)
        .bind(&model.stream_url)
        .bind(&model.stream_format)
        .bind(model.last_http_code)
        .bind(&model.last_error_code)
        .bind(&model.last_error_message)
        .bind(model.last_checked_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_status(&self, channel_id: &str) -> Result<Option<ChannelStatus>> {
        let row = sqlx::query_as::<_, ChannelStatusDbModel>(
            "SELECT * FROM channel_status WHERE channel_id = ?",
        )
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ChannelStatus::from))
    }
}

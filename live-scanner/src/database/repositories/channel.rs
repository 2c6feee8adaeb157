//! Channel repository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::database::models::ChannelDbModel;
use crate::database::time::now_ms;
use crate::domain::Channel;
use crate::{Error, Result};

/// Channel repository trait.
#[async_trait]
pub trait ChannelRepository: Send + Sync {
    /// All currently enabled channels.
    async fn list_enabled(&self) -> Result<Vec<Channel>>;
    async fn get_channel(&self, id: &str) -> Result<Channel>;
    async fn create_channel(&self, channel: &Channel) -> Result<()>;
    async fn set_enabled(&self, id: &str, enabled: bool) -> Result<()>;
}

/// SQLx implementation of ChannelRepository.
pub struct SqlxChannelRepository {
    pool: SqlitePool,
}

impl SqlxChannelRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChannelRepository for SqlxChannelRepository {
    async fn list_enabled(&self) -> Result<Vec<Channel>> {
        let channels = sqlx::query_as::<_, ChannelDbModel>(
            "SELECT * FROM channels WHERE enabled = 1 ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(channels.into_iter().map(Channel::from).collect())
    }

    async fn get_channel(&self, id: &str) -> Result<Channel> {
        sqlx::query_as::<_, ChannelDbModel>("SELECT * FROM channels WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Channel::from)
            .ok_or_else(|| Error::not_found("Channel", id))
    }

    async fn create_channel(&self, channel: &Channel) -> Result<()> {
        let model = ChannelDbModel::from(channel);
        sqlx::query(
            r#"
            INSERT INTO channels (id, name, channel_ref, live_url, enabled, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&model.id)
        .bind(&model.name)
        .bind(&model.channel_ref)
        .bind(&model.live_url)
        .bind(model.enabled)
        .bind(model.created_at)
        .bind(model.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        let result = sqlx::query("UPDATE channels SET enabled = ?, updated_at = ? WHERE id = ?")
            .bind(enabled)
            .bind(now_ms())
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("Channel", id));
        }
        Ok(())
    }
}

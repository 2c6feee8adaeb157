//! Channel database model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::time::now_ms;
use crate::domain::Channel;

/// Channel database model.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ChannelDbModel {
    pub id: String,
    pub name: String,
    pub channel_ref: String,
    pub live_url: String,
    pub enabled: bool,
    /// Unix epoch milliseconds (UTC) when created.
    pub created_at: i64,
    /// Unix epoch milliseconds (UTC) when last updated.
    pub updated_at: i64,
}

impl From<&Channel> for ChannelDbModel {
    fn from(channel: &Channel) -> Self {
        let now = now_ms();
        Self {
            id: channel.id.clone(),
            name: channel.name.clone(),
            channel_ref: channel.channel_ref.clone(),
            live_url: channel.live_url.clone(),
            enabled: channel.enabled,
            created_at: now,
            updated_at: now,
        }
    }
}

impl From<ChannelDbModel> for Channel {
    fn from(model: ChannelDbModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            channel_ref: model.channel_ref,
            live_url: model.live_url,
            enabled: model.enabled,
        }
    }
}

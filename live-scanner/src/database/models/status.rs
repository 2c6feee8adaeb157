//! Channel status database model.

use sqlx::FromRow;

use crate::database::time::ms_to_datetime;
use crate::domain::{ChannelStatus, CheckResult, StreamFormat};

/// One row per channel, overwritten after every check.
#[derive(Debug, Clone, FromRow)]
pub struct ChannelStatusDbModel {
    pub channel_id: String,
    pub is_live: bool,
    pub is_online: bool,
    pub session_id: Option<String>,
    pub stream_url: Option<String>,
    /// HLS, DASH, FLV, MP4 or UNKNOWN
    pub stream_format: Option<String>,
    pub last_http_code: Option<i64>,
    pub last_error_code: Option<String>,
    pub last_error_message: Option<String>,
    /// Unix epoch milliseconds (UTC).
    pub last_checked_at: i64,
}

impl From<&ChannelStatus> for ChannelStatusDbModel {
    fn from(status: &ChannelStatus) -> Self {
        Self {
            channel_id: status.channel_id.clone(),
            is_live: status.is_live,
            is_online: status.is_online,
            session_id: status.session_id.clone(),
            stream_url: status.stream_url.clone(),
            stream_format: status.stream_format.map(|f| f.as_str().to_string()),
            last_http_code: status.last_http_code.map(i64::from),
            last_error_code: status.last_error_code.map(|c| c.as_str().to_string()),
            last_error_message: status.last_error_message.clone(),
            last_checked_at: status.last_checked_at.timestamp_millis(),
        }
    }
}

impl From<ChannelStatusDbModel> for ChannelStatus {
    fn from(model: ChannelStatusDbModel) -> Self {
        Self {
            channel_id: model.channel_id,
            is_live: model.is_live,
            is_online: model.is_online,
            session_id: model.session_id,
            stream_url: model.stream_url,
            stream_format: model.stream_format.as_deref().and_then(StreamFormat::parse),
            last_http_code: model.last_http_code.and_then(|c| u16::try_from(c).ok()),
            last_error_code: model.last_error_code.as_deref().and_then(CheckResult::parse),
            last_error_message: model.last_error_message,
            last_checked_at: ms_to_datetime(model.last_checked_at),
        }
    }
}

//! Persisted status and history shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::check::{CheckOutcome, CheckResult, StreamFormat};

/// Current best knowledge about a channel, overwritten after every check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStatus {
    pub channel_id: String,
    pub is_live: bool,
    pub is_online: bool,
    pub session_id: Option<String>,
    pub stream_url: Option<String>,
    pub stream_format: Option<StreamFormat>,
    pub last_http_code: Option<u16>,
    pub last_error_code: Option<CheckResult>,
    pub last_error_message: Option<String>,
    pub last_checked_at: DateTime<Utc>,
}

impl ChannelStatus {
    pub fn from_outcome(
        channel_id: impl Into<String>,
        outcome: &CheckOutcome,
        checked_at: DateTime<Utc>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            is_live: outcome.is_live,
            is_online: outcome.is_online,
            session_id: outcome.session_id.clone(),
            stream_url: outcome.stream_url.clone(),
            stream_format: outcome.stream_format,
            last_http_code: outcome.http_code,
            last_error_code: outcome.error_code(),
            last_error_message: outcome.error_message.clone(),
            last_checked_at: checked_at,
        }
    }
}

/// Append-only record of one `run()` call, covering all of its attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckHistoryEntry {
    pub id: String,
    pub channel_id: String,
    pub result: CheckResult,
    pub details: serde_json::Value,
    pub duration_ms: u64,
    pub created_at: DateTime<Utc>,
}

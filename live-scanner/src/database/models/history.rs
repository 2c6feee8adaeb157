//! Check history database model.

use sqlx::FromRow;

use crate::database::time::ms_to_datetime;
use crate::domain::{CheckHistoryEntry, CheckResult};
use crate::{Error, Result};

/// Append-only history row.
#[derive(Debug, Clone, FromRow)]
pub struct CheckHistoryDbModel {
    pub id: String,
    pub channel_id: String,
    pub result: String,
    /// JSON detail blob
    pub details: String,
    pub duration_ms: i64,
    pub created_at: i64,
}

impl TryFrom<CheckHistoryDbModel> for CheckHistoryEntry {
    type Error = Error;

    fn try_from(model: CheckHistoryDbModel) -> Result<Self> {
        let result = CheckResult::parse(&model.result).ok_or_else(|| {
            Error::validation(format!("unknown check result '{}'", model.result))
        })?;

        Ok(Self {
            id: model.id,
            channel_id: model.channel_id,
            result,
            details: serde_json::from_str(&model.details)?,
            duration_ms: u64::try_from(model.duration_ms).unwrap_or_default(),
            created_at: ms_to_datetime(model.created_at),
        })
    }
}

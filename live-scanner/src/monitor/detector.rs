//! Live detection and stream resolution contracts.
//!
//! The checker talks to these traits only; `YtDlpDetector` / `YtDlpResolver`
//! are the production implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Channel, CheckResult, StreamFormat};

/// Kind of a classified tool failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The source refused automated access.
    Blocked,
    /// The tool or its network access ran out of time.
    Timeout,
    /// Any other tool failure.
    Tool,
}

/// A classified failure from the detection or resolution tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ToolFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn blocked(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Blocked, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Timeout, message)
    }

    pub fn tool(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Tool, message)
    }

    pub fn check_result(&self) -> CheckResult {
        match self.kind {
            FailureKind::Blocked => CheckResult::Blocked,
            FailureKind::Timeout => CheckResult::Timeout,
            FailureKind::Tool => CheckResult::YtdlpFail,
        }
    }
}

impl std::fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Outcome of live detection for one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    /// Broadcasting now, with the live session id.
    Live { session_id: String },
    /// Not broadcasting.
    NotLive,
    /// A broadcast is scheduled for later.
    Scheduled {
        starts_at: Option<DateTime<Utc>>,
        message: Option<String>,
    },
    /// The source is blocking automated access.
    Blocked { message: String },
    /// Transient failure (timeout or tool error).
    Failed(ToolFailure),
}

/// A directly playable stream address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStream {
    pub url: String,
    pub format: StreamFormat,
}

impl ResolvedStream {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let format = StreamFormat::from_url(&url);
        Self { url, format }
    }
}

/// Decides whether a channel is currently live.
#[async_trait]
pub trait LiveDetector: Send + Sync {
    async fn detect(&self, channel: &Channel) -> Detection;
}

/// Resolves a live session into a playable stream address.
#[async_trait]
pub trait StreamResolver: Send + Sync {
    async fn resolve(
        &self,
        channel: &Channel,
        session_id: &str,
    ) -> std::result::Result<ResolvedStream, ToolFailure>;
}

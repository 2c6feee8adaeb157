//! Check classifications and per-check outcomes.

use serde::{Deserialize, Serialize};

/// Final classification of one channel check.
///
/// Exactly one applies per check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckResult {
    /// Live and the resolved stream serves media.
    Online,
    /// The channel is not broadcasting.
    NoLive,
    /// A broadcast is scheduled for later.
    Scheduled,
    /// The upstream source is refusing automated access.
    Blocked,
    /// The extraction tool or a request ran out of time.
    Timeout,
    /// The extraction tool failed for another reason.
    YtdlpFail,
    /// The stream was resolved but did not validate over HTTP.
    HttpFail,
}

impl CheckResult {
    /// Number of classifications.
    pub const COUNT: usize = 7;

    /// All classifications, in a stable order.
    pub const ALL: [CheckResult; Self::COUNT] = [
        Self::Online,
        Self::NoLive,
        Self::Scheduled,
        Self::Blocked,
        Self::Timeout,
        Self::YtdlpFail,
        Self::HttpFail,
    ];

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "ONLINE",
            Self::NoLive => "NO_LIVE",
            Self::Scheduled => "SCHEDULED",
            Self::Blocked => "BLOCKED",
            Self::Timeout => "TIMEOUT",
            Self::YtdlpFail => "YTDLP_FAIL",
            Self::HttpFail => "HTTP_FAIL",
        }
    }

    /// Parse from database string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ONLINE" => Some(Self::Online),
            "NO_LIVE" => Some(Self::NoLive),
            "SCHEDULED" => Some(Self::Scheduled),
            "BLOCKED" => Some(Self::Blocked),
            "TIMEOUT" => Some(Self::Timeout),
            "YTDLP_FAIL" => Some(Self::YtdlpFail),
            "HTTP_FAIL" => Some(Self::HttpFail),
            _ => None,
        }
    }

    /// Transient failures that are retried within a single check.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::YtdlpFail | Self::HttpFail)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Online)
    }
}

impl std::fmt::Display for CheckResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Container format of a resolved stream address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamFormat {
    Hls,
    Dash,
    Flv,
    Mp4,
    Unknown,
}

impl StreamFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hls => "HLS",
            Self::Dash => "DASH",
            Self::Flv => "FLV",
            Self::Mp4 => "MP4",
            Self::Unknown => "UNKNOWN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "HLS" => Some(Self::Hls),
            "DASH" => Some(Self::Dash),
            "FLV" => Some(Self::Flv),
            "MP4" => Some(Self::Mp4),
            "UNKNOWN" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Infer the format from a stream address.
    pub fn from_url(url: &str) -> Self {
        let lower = url.to_ascii_lowercase();
        let path = lower.split(['?', '#']).next().unwrap_or_default();

        if path.ends_with(".m3u8") || lower.contains(".m3u8") || lower.contains("/hls") {
            Self::Hls
        } else if path.ends_with(".mpd") || lower.contains("/dash") {
            Self::Dash
        } else if path.ends_with(".flv") {
            Self::Flv
        } else if path.ends_with(".mp4") {
            Self::Mp4
        } else {
            Self::Unknown
        }
    }
}

impl std::fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authoritative outcome of one `ChannelChecker::run` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub result: CheckResult,
    /// Verbatim (possibly truncated) diagnostic text for non-success results.
    pub error_message: Option<String>,
    pub is_live: bool,
    pub is_online: bool,
    pub session_id: Option<String>,
    pub stream_url: Option<String>,
    pub stream_format: Option<StreamFormat>,
    /// Last HTTP status observed while validating.
    pub http_code: Option<u16>,
    /// Elapsed time across all attempts.
    pub duration_ms: u64,
    /// Number of attempts made.
    pub attempts: u32,
    /// Suggested delay before the next check, set only when blocked.
    pub cooldown_secs: Option<u64>,
}

impl CheckOutcome {
    fn base(result: CheckResult) -> Self {
        Self {
            result,
            error_message: None,
            is_live: false,
            is_online: false,
            session_id: None,
            stream_url: None,
            stream_format: None,
            http_code: None,
            duration_ms: 0,
            attempts: 0,
            cooldown_secs: None,
        }
    }

    pub fn online(
        session_id: impl Into<String>,
        stream_url: impl Into<String>,
        stream_format: StreamFormat,
        http_code: Option<u16>,
    ) -> Self {
        Self {
            is_live: true,
            is_online: true,
            session_id: Some(session_id.into()),
            stream_url: Some(stream_url.into()),
            stream_format: Some(stream_format),
            http_code,
            ..Self::base(CheckResult::Online)
        }
    }

    pub fn no_live() -> Self {
        Self::base(CheckResult::NoLive)
    }

    pub fn scheduled(message: Option<String>) -> Self {
        Self {
            error_message: message,
            ..Self::base(CheckResult::Scheduled)
        }
    }

    pub fn blocked(message: impl Into<String>, cooldown_secs: u64) -> Self {
        Self {
            error_message: Some(message.into()),
            cooldown_secs: Some(cooldown_secs),
            ..Self::base(CheckResult::Blocked)
        }
    }

    /// A classified failure (`Timeout`, `YtdlpFail`, `HttpFail`).
    pub fn failed(result: CheckResult, message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
            ..Self::base(result)
        }
    }

    /// Mark the outcome as belonging to a detected live session.
    pub fn in_session(mut self, session_id: impl Into<String>) -> Self {
        self.is_live = true;
        self.session_id = Some(session_id.into());
        self
    }

    /// Attach the resolved stream for diagnostics.
    pub fn with_stream(
        mut self,
        stream_url: impl Into<String>,
        stream_format: StreamFormat,
        http_code: Option<u16>,
    ) -> Self {
        self.stream_url = Some(stream_url.into());
        self.stream_format = Some(stream_format);
        self.http_code = http_code;
        self
    }

    /// Error code, present for every non-success classification.
    pub fn error_code(&self) -> Option<CheckResult> {
        (!self.result.is_success()).then_some(self.result)
    }

    pub fn is_retryable(&self) -> bool {
        self.result.is_retryable()
    }

    /// Structured detail blob stored with the history entry.
    pub fn details(&self) -> serde_json::Value {
        serde_json::json!({
            "result": self.result,
            "error_code": self.error_code(),
            "error_message": self.error_message,
            "is_live": self.is_live,
            "is_online": self.is_online,
            "session_id": self.session_id,
            "stream_url": self.stream_url,
            "stream_format": self.stream_format,
            "http_code": self.http_code,
            "attempts": self.attempts,
            "cooldown_secs": self.cooldown_secs,
        })
    }
}

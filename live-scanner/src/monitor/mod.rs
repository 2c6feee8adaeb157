//! Channel monitoring.
//!
//! - `CircuitBreaker`: process-wide throttle when the source starts blocking
//! - `LiveDetector` / `StreamResolver`: detection and resolution contracts,
//!   implemented on top of yt-dlp
//! - `StreamValidator`: HTTP probe of resolved stream addresses
//! - `ChannelChecker`: the per-channel pipeline with bounded retries

mod breaker;
mod checker;
mod classify;
mod detector;
mod retry;
mod validator;
mod ytdlp;

pub use breaker::{BreakerConfig, BreakerStatus, CircuitBreaker};
pub use checker::{BREAKER_OPEN_MESSAGE, ChannelChecker};
pub use classify::{
    DEFAULT_BLOCKED_PATTERNS, DEFAULT_NOT_LIVE_PATTERNS, DEFAULT_TIMEOUT_PATTERNS,
    DEFAULT_UPCOMING_PATTERNS, OutputClass, OutputClassifier, truncate_message,
};
pub use detector::{
    Detection, FailureKind, LiveDetector, ResolvedStream, StreamResolver, ToolFailure,
};
pub use retry::RetryConfig;
pub use validator::{
    ContentKind, HttpStreamValidator, StreamValidator, ValidationReport, ValidatorConfig,
    content_kind, has_playlist_marker,
};
pub use ytdlp::{ToolConfig, YtDlpDetector, YtDlpResolver, YtDlpRunner};

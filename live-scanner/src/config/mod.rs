//! Process configuration.
//!
//! Defaults are overridden from environment variables (a `.env` file is
//! loaded first when present). Invalid values are logged and ignored.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::monitor::{BreakerConfig, RetryConfig, ToolConfig, ValidatorConfig};
use crate::scheduler::SchedulerConfig;

/// Upper bound for the scan interval and the breaker cooldown (30 days).
pub const MAX_DELAY_SECS: u64 = 30 * 24 * 60 * 60;

/// Aggregated runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub scheduler: SchedulerConfig,
    pub retry: RetryConfig,
    pub breaker: BreakerConfig,
    pub tool: ToolConfig,
    pub validator: ValidatorConfig,
}

impl AppConfig {
    /// Load `.env` if present, then apply environment overrides to the defaults.
    pub fn from_env_or_default() -> Self {
        if let Err(e) = dotenvy::dotenv()
            && !e.not_found()
        {
            warn!(error = %e, "Failed to load .env file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(secs) = parse_var::<u64>("SCAN_INTERVAL_SECS", get("SCAN_INTERVAL_SECS")) {
            config.scheduler.scan_interval = Duration::from_secs(secs);
        }
        if let Some(n) = parse_var::<usize>("SCAN_CONCURRENCY", get("SCAN_CONCURRENCY")) {
            config.scheduler.concurrency = n;
        }
        if let Some(secs) = parse_var::<u64>("SCAN_REFRESH_SECS", get("SCAN_REFRESH_SECS")) {
            config.scheduler.refresh_interval = Duration::from_secs(secs);
        }
        if let Some(n) = parse_var::<u32>("SCAN_MAX_RETRIES", get("SCAN_MAX_RETRIES")) {
            config.scheduler.max_retries = n;
        }
        if let Some(ms) = parse_var::<u64>("SCAN_RETRY_BASE_MS", get("SCAN_RETRY_BASE_MS")) {
            config.retry.initial_delay_ms = ms;
        }
        if let Some(n) = parse_var::<u32>("BREAKER_THRESHOLD", get("BREAKER_THRESHOLD")) {
            config.breaker.threshold = n;
        }
        if let Some(secs) = parse_var::<u64>("BREAKER_COOLDOWN_SECS", get("BREAKER_COOLDOWN_SECS"))
        {
            config.breaker.cooldown_secs = secs;
        }
        if let Some(path) = get("YTDLP_PATH") {
            config.tool.binary_path = path.trim().to_string();
        }
        if let Some(format) = get("YTDLP_FORMAT") {
            config.tool.format_selector = format.trim().to_string();
        }
        if let Some(secs) = parse_var::<u64>("YTDLP_TIMEOUT_SECS", get("YTDLP_TIMEOUT_SECS")) {
            config.tool.detect_timeout = Duration::from_secs(secs);
            config.tool.resolve_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>("VALIDATE_TIMEOUT_SECS", get("VALIDATE_TIMEOUT_SECS"))
        {
            config.validator.head_timeout = Duration::from_secs(secs);
            config.validator.get_timeout = Duration::from_secs(secs);
        }

        config
    }

    /// Reject settings the scanner cannot run with.
    pub fn validate(&self) -> crate::Result<()> {
        if self.scheduler.concurrency == 0 {
            return Err(crate::Error::config("concurrency must be at least 1"));
        }
        if self.scheduler.scan_interval.is_zero() {
            return Err(crate::Error::config("scan interval must be positive"));
        }
        if self.scheduler.tick_interval.is_zero() {
            return Err(crate::Error::config("tick interval must be positive"));
        }
        if self.breaker.threshold == 0 {
            return Err(crate::Error::config("breaker threshold must be at least 1"));
        }
        if self.scheduler.scan_interval > Duration::from_secs(MAX_DELAY_SECS) {
            return Err(crate::Error::config(format!(
                "scan interval must not exceed {MAX_DELAY_SECS}s"
            )));
        }
        if self.breaker.cooldown_secs > MAX_DELAY_SECS {
            return Err(crate::Error::config(format!(
                "breaker cooldown must not exceed {MAX_DELAY_SECS}s"
            )));
        }
        if self.tool.binary_path.is_empty() {
            return Err(crate::Error::config("yt-dlp path must not be empty"));
        }
        if self.tool.detect_timeout.is_zero() || self.tool.resolve_timeout.is_zero() {
            return Err(crate::Error::config("yt-dlp timeouts must be positive"));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &str, value: Option<String>) -> Option<T> {
    let value = value?;
    match value.trim().parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(key, value = %value, "Ignoring invalid environment value");
            None
        }
    }
}

//! Retry backoff for transient check failures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Largest fraction of the base delay added as jitter.
const JITTER_FRACTION: f64 = 0.25;

/// Backoff between attempts of one check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Delay before the second attempt in milliseconds.
    pub initial_delay_ms: u64,
    /// Optional ceiling on a single delay. `None` leaves growth unbounded.
    pub max_delay_ms: Option<u64>,
    /// Growth factor per failed attempt.
    pub backoff_multiplier: f64,
    pub use_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1000,
            max_delay_ms: None,
            backoff_multiplier: 2.0,
            use_jitter: false,
        }
    }
}

impl RetryConfig {
    /// Sleep after failed attempt `attempt` (counted from 1):
    /// `initial_delay_ms * backoff_multiplier^(attempt - 1)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let Some(exponent) = attempt.checked_sub(1) else {
            return Duration::ZERO;
        };

        let exponent = i32::try_from(exponent).unwrap_or(i32::MAX);
        let mut millis = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        if let Some(cap) = self.max_delay_ms {
            millis = millis.min(cap as f64);
        }
        if self.use_jitter {
            millis += millis * JITTER_FRACTION * rand::random::<f64>();
        }

        Duration::try_from_secs_f64(millis / 1000.0).unwrap_or(Duration::MAX)
    }
}

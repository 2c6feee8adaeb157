//! Process-wide circuit breaker for upstream blocking.
//!
//! Every channel check shares one breaker. A cluster of "blocked" signals
//! opens a cooldown window during which checks are abandoned before any
//! network access; any genuine success closes it again immediately.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Configuration for the blocking circuit breaker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Consecutive blocked signals that open the breaker.
    pub threshold: u32,
    /// How long the breaker stays open once tripped.
    pub cooldown_secs: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            threshold: 3,
            cooldown_secs: 600,
        }
    }
}

/// Observable breaker state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerStatus {
    pub is_open: bool,
    pub opened_until: Option<DateTime<Utc>>,
    pub blocked_count: u32,
    pub threshold: u32,
    pub cooldown_secs: u64,
}

#[derive(Debug, Default)]
struct BreakerState {
    blocked_count: u32,
    opened_until: Option<DateTime<Utc>>,
}

/// Circuit breaker keyed on blocked signals from the upstream source.
///
/// `is_open(now)` holds iff `now < opened_until`. All mutation happens under a
/// single lock so concurrent checks see consistent read-modify-write.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    config: BreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            state: Mutex::new(BreakerState::default()),
            config,
        }
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.state
            .lock()
            .opened_until
            .is_some_and(|until| now < until)
    }

    /// Seconds left in the current cooldown window, rounded up; `None` when closed.
    pub fn remaining_cooldown_secs(&self, now: DateTime<Utc>) -> Option<u64> {
        let until = self.state.lock().opened_until?;
        if now >= until {
            return None;
        }
        let remaining_ms = (until - now).num_milliseconds().max(0) as u64;
        Some(remaining_ms.div_ceil(1000).max(1))
    }

    /// Record a blocked signal. Returns `true` when this call opened the breaker.
    pub fn record_blocked(&self, now: DateTime<Utc>) -> bool {
        let mut state = self.state.lock();
        state.blocked_count += 1;

        if state.blocked_count < self.config.threshold {
            debug!(
                blocked_count = state.blocked_count,
                threshold = self.config.threshold,
                "Blocked signal recorded"
            );
            return false;
        }

        state.blocked_count = 0;

        // One window per threshold crossing; an open window is never extended.
        if state.opened_until.is_some_and(|until| now < until) {
            return false;
        }

        let until = window_end(now, self.config.cooldown_secs);
        state.opened_until = Some(until);
        warn!(
            threshold = self.config.threshold,
            cooldown_secs = self.config.cooldown_secs,
            opened_until = %until,
            "Circuit breaker opened: upstream appears to be blocking requests"
        );
        true
    }

    /// Record a genuine success: clears the counter and closes the breaker.
    pub fn record_success(&self) {
        let mut state = self.state.lock();
        if state.opened_until.take().is_some() {
            info!("Circuit breaker closed after successful check");
        }
        state.blocked_count = 0;
    }

    pub fn status(&self, now: DateTime<Utc>) -> BreakerStatus {
        let state = self.state.lock();
        BreakerStatus {
            is_open: state.opened_until.is_some_and(|until| now < until),
            opened_until: state.opened_until,
            blocked_count: state.blocked_count,
            threshold: self.config.threshold,
            cooldown_secs: self.config.cooldown_secs,
        }
    }
}

/// End of a cooldown window, saturating at the latest representable time.
fn window_end(now: DateTime<Utc>, cooldown_secs: u64) -> DateTime<Utc> {
    i64::try_from(cooldown_secs)
        .ok()
        .and_then(ChronoDuration::try_seconds)
        .and_then(|cooldown| now.checked_add_signed(cooldown))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}

//! Aggregate scan metrics.
//!
//! Plain atomic counters so that reading a snapshot never blocks or fails.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::time::{ms_to_datetime, now_ms};
use crate::domain::{CheckOutcome, CheckResult};

/// Cumulative counters for completed checks.
#[derive(Debug, Default)]
pub struct ScanMetrics {
    total_checks: AtomicU64,
    by_result: [AtomicU64; CheckResult::COUNT],
    duration_total_ms: AtomicU64,
    /// Epoch ms of the last completed check, 0 when none.
    last_check_at_ms: AtomicI64,
    /// Checks that ended in an unexpected error instead of an outcome.
    unexpected_errors: AtomicU64,
}

fn slot(result: CheckResult) -> usize {
    CheckResult::ALL
        .iter()
        .position(|r| *r == result)
        .unwrap_or_default()
}

/// Point-in-time copy of the metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanMetricsSnapshot {
    pub total_checks: u64,
    pub results: BTreeMap<String, u64>,
    /// Percentage of all checks that ended in each non-success result.
    pub error_rates: BTreeMap<String, f64>,
    pub avg_duration_ms: f64,
    pub last_check_at: Option<DateTime<Utc>>,
    pub unexpected_errors: u64,
}

impl ScanMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: &CheckOutcome) {
        self.total_checks.fetch_add(1, Ordering::Relaxed);
        self.by_result[slot(outcome.result)].fetch_add(1, Ordering::Relaxed);
        self.duration_total_ms
            .fetch_add(outcome.duration_ms, Ordering::Relaxed);
        self.last_check_at_ms.store(now_ms(), Ordering::Relaxed);
    }

    pub fn record_unexpected_error(&self) {
        self.unexpected_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_checks(&self) -> u64 {
        self.total_checks.load(Ordering::Relaxed)
    }

    pub fn count(&self, result: CheckResult) -> u64 {
        self.by_result[slot(result)].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> ScanMetricsSnapshot {
        let total = self.total_checks();
        let mut results = BTreeMap::new();
        let mut error_rates = BTreeMap::new();

        for result in CheckResult::ALL {
            let count = self.count(result);
            results.insert(result.as_str().to_string(), count);
            if !result.is_success() {
                let rate = if total == 0 {
                    0.0
                } else {
                    count as f64 * 100.0 / total as f64
                };
                error_rates.insert(result.as_str().to_string(), rate);
            }
        }

        let avg_duration_ms = if total == 0 {
            0.0
        } else {
            self.duration_total_ms.load(Ordering::Relaxed) as f64 / total as f64
        };

        let last = self.last_check_at_ms.load(Ordering::Relaxed);

        ScanMetricsSnapshot {
            total_checks: total,
            results,
            error_rates,
            avg_duration_ms,
            last_check_at: (last > 0).then(|| ms_to_datetime(last)),
            unexpected_errors: self.unexpected_errors.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StreamFormat;

    fn with_duration(mut outcome: CheckOutcome, duration_ms: u64) -> CheckOutcome {
        outcome.duration_ms = duration_ms;
        outcome
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = ScanMetrics::new().snapshot();
        assert_eq!(snapshot.total_checks, 0);
        assert_eq!(snapshot.avg_duration_ms, 0.0);
        assert_eq!(snapshot.last_check_at, None);
        assert_eq!(snapshot.results.len(), CheckResult::COUNT);
        assert!(!snapshot.error_rates.contains_key("ONLINE"));
    }

    #[test]
    fn test_rates_and_average() {
        let metrics = ScanMetrics::new();
        metrics.record(&with_duration(
            CheckOutcome::online("v", "https://cdn/x.m3u8", StreamFormat::Hls, Some(200)),
            100,
        ));
        metrics.record(&with_duration(CheckOutcome::no_live(), 200));
        metrics.record(&with_duration(
            CheckOutcome::failed(CheckResult::Timeout, "t"),
            300,
        ));
        metrics.record(&with_duration(
            CheckOutcome::failed(CheckResult::Timeout, "t"),
            400,
        ));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_checks, 4);
        assert_eq!(snapshot.results["ONLINE"], 1);
        assert_eq!(snapshot.results["TIMEOUT"], 2);
        assert_eq!(snapshot.error_rates["TIMEOUT"], 50.0);
        assert_eq!(snapshot.error_rates["NO_LIVE"], 25.0);
        assert_eq!(snapshot.error_rates["BLOCKED"], 0.0);
        assert_eq!(snapshot.avg_duration_ms, 250.0);
        assert!(snapshot.last_check_at.is_some());
    }
}

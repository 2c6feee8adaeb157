//! Single-channel check pipeline.
//!
//! One `run()` produces one authoritative outcome: it gates on the shared
//! circuit breaker, sequences detection, resolution and validation, retries
//! transient failures with exponential backoff, and records exactly one
//! status upsert and one history entry.

use std::sync::Arc;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::breaker::CircuitBreaker;
use super::detector::{Detection, FailureKind, LiveDetector, StreamResolver, ToolFailure};
use super::retry::RetryConfig;
use super::validator::StreamValidator;
use crate::Result;
use crate::database::repositories::{HistoryRepository, StatusRepository};
use crate::domain::{Channel, ChannelStatus, CheckOutcome, CheckResult};

/// Message recorded when a check is abandoned because the breaker is open.
pub const BREAKER_OPEN_MESSAGE: &str = "circuit breaker open; check skipped";

/// Runs checks for individual channels.
pub struct ChannelChecker {
    detector: Arc<dyn LiveDetector>,
    resolver: Arc<dyn StreamResolver>,
    validator: Arc<dyn StreamValidator>,
    breaker: Arc<CircuitBreaker>,
    status_repo: Arc<dyn StatusRepository>,
    history_repo: Arc<dyn HistoryRepository>,
    retry: RetryConfig,
}

impl ChannelChecker {
    pub fn new(
        detector: Arc<dyn LiveDetector>,
        resolver: Arc<dyn StreamResolver>,
        validator: Arc<dyn StreamValidator>,
        breaker: Arc<CircuitBreaker>,
        status_repo: Arc<dyn StatusRepository>,
        history_repo: Arc<dyn HistoryRepository>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            detector,
            resolver,
            validator,
            breaker,
            status_repo,
            history_repo,
            retry,
        }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Check one channel, allowing up to `max_retries` attempts in total.
    ///
    /// A budget of zero still performs a single attempt. `Err` is returned
    /// only when recording the outcome fails.
    pub async fn run(&self, channel: &Channel, max_retries: u32) -> Result<CheckOutcome> {
        let budget = max_retries.max(1);
        let started = Instant::now();
        let mut attempt = 1;

        let mut outcome = loop {
            let outcome = self.check_once(channel).await;

            if outcome.is_retryable() && attempt < budget {
                let delay = self.retry.delay_for_attempt(attempt);
                debug!(
                    channel_id = %channel.id,
                    attempt,
                    result = %outcome.result,
                    delay_ms = delay.as_millis() as u64,
                    "Transient check failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            break outcome;
        };

        outcome.attempts = attempt;
        outcome.duration_ms = started.elapsed().as_millis() as u64;

        self.record(channel, &outcome).await?;

        info!(
            channel_id = %channel.id,
            channel = %channel.name,
            result = %outcome.result,
            attempts = outcome.attempts,
            duration_ms = outcome.duration_ms,
            "Channel check finished"
        );

        Ok(outcome)
    }

    /// A single attempt: breaker gate, detection, resolution, validation.
    pub async fn check_once(&self, channel: &Channel) -> CheckOutcome {
        if let Some(remaining) = self.breaker.remaining_cooldown_secs(Utc::now()) {
            debug!(channel_id = %channel.id, remaining, "Breaker open, skipping check");
            return CheckOutcome::blocked(BREAKER_OPEN_MESSAGE, remaining);
        }

        let session_id = match self.detector.detect(channel).await {
            Detection::Live { session_id } => session_id,
            Detection::NotLive => {
                self.breaker.record_success();
                return CheckOutcome::no_live();
            }
            Detection::Scheduled { starts_at, message } => {
                self.breaker.record_success();
                let message =
                    message.or_else(|| starts_at.map(|t| format!("scheduled to start at {t}")));
                return CheckOutcome::scheduled(message);
            }
            Detection::Blocked { message } => return self.blocked(channel, message),
            Detection::Failed(failure) if failure.kind == FailureKind::Blocked => {
                return self.blocked(channel, failure.message);
            }
            Detection::Failed(failure) => return failed(failure),
        };

        let stream = match self.resolver.resolve(channel, &session_id).await {
            Ok(stream) => stream,
            Err(failure) if failure.kind == FailureKind::Blocked => {
                return self.blocked(channel, failure.message).in_session(session_id);
            }
            Err(failure) => return failed(failure).in_session(session_id),
        };

        let report = self.validator.validate(&stream.url).await;
        if !report.online {
            return CheckOutcome::failed(CheckResult::HttpFail, report.detail)
                .in_session(session_id)
                .with_stream(stream.url, stream.format, report.http_code);
        }

        self.breaker.record_success();
        CheckOutcome::online(session_id, stream.url, stream.format, report.http_code)
    }

    fn blocked(&self, channel: &Channel, message: String) -> CheckOutcome {
        let now = Utc::now();
        self.breaker.record_blocked(now);
        let cooldown = self
            .breaker
            .remaining_cooldown_secs(now)
            .unwrap_or(self.breaker.config().cooldown_secs);
        warn!(channel_id = %channel.id, cooldown, "Upstream blocked the check: {}", message);
        CheckOutcome::blocked(message, cooldown)
    }

    async fn record(&self, channel: &Channel, outcome: &CheckOutcome) -> Result<()> {
        let status = ChannelStatus::from_outcome(&channel.id, outcome, Utc::now());
        self.status_repo.upsert(&status).await?;
        self.history_repo
            .add(
                &channel.id,
                outcome.result,
                &outcome.details(),
                outcome.duration_ms,
            )
            .await?;
        Ok(())
    }
}

fn failed(failure: ToolFailure) -> CheckOutcome {
    CheckOutcome::failed(failure.check_result(), failure.message)
}

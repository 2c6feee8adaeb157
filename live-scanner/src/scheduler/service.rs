//! Scanner service implementation.
//!
//! The Scanner owns the job table and the processing set behind a single
//! lock, so "due and not processing" and "mark processing" happen as one
//! step. Each dispatched check runs as its own task and releases its channel
//! through a drop guard, on success, error and panic alike.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use super::job::ScannerJob;
use super::metrics::{ScanMetrics, ScanMetricsSnapshot};
use crate::Result;
use crate::database::repositories::ChannelRepository;
use crate::domain::{Channel, CheckOutcome};
use crate::monitor::{BreakerStatus, ChannelChecker};

/// Default scan interval (60 seconds).
const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(60);

/// Default channel table refresh interval (30 seconds).
const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Scheduler tick cadence.
const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Fallback schedule when a delay overflows the clock (about 30 years).
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Delay between checks of the same channel when no cooldown applies.
    pub scan_interval: Duration,
    /// Maximum checks in flight at once.
    pub concurrency: usize,
    /// How often the channel table is reloaded from storage.
    pub refresh_interval: Duration,
    /// Timer cadence.
    pub tick_interval: Duration,
    /// Attempt budget passed to every check.
    pub max_retries: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            scan_interval: DEFAULT_SCAN_INTERVAL,
            concurrency: 5,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            tick_interval: DEFAULT_TICK_INTERVAL,
            max_retries: 3,
        }
    }
}

/// Snapshot returned by `Scanner::status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerStatus {
    pub running: bool,
    pub concurrency: usize,
    pub scan_interval_secs: u64,
    pub total_jobs: usize,
    /// Jobs currently due.
    pub queue_depth: usize,
    /// Channel ids with a check in flight.
    pub processing: Vec<String>,
    #[serde(flatten)]
    pub metrics: ScanMetricsSnapshot,
    pub breaker: BreakerStatus,
}

#[derive(Debug, Default)]
struct ScanState {
    jobs: HashMap<String, ScannerJob>,
    processing: HashSet<String>,
    last_refresh: Option<Instant>,
}

struct ScannerInner {
    channels: Arc<dyn ChannelRepository>,
    checker: Arc<ChannelChecker>,
    config: SchedulerConfig,
    state: Mutex<ScanState>,
    metrics: ScanMetrics,
    /// Admission limit for in-flight checks, shared by the tick loop and `run_once`.
    permits: Arc<Semaphore>,
    /// Every spawned check, so shutdown can wait for them.
    tasks: TaskTracker,
    running: AtomicBool,
}

struct Ticker {
    cancellation_token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Top-level liveness scheduler.
pub struct Scanner {
    inner: Arc<ScannerInner>,
    ticker: tokio::sync::Mutex<Option<Ticker>>,
}

impl Scanner {
    pub fn new(
        channels: Arc<dyn ChannelRepository>,
        checker: Arc<ChannelChecker>,
        config: SchedulerConfig,
    ) -> Self {
        let concurrency = config.concurrency.max(1);
        Self {
            inner: Arc::new(ScannerInner {
                channels,
                checker,
                config,
                state: Mutex::new(ScanState::default()),
                metrics: ScanMetrics::new(),
                permits: Arc::new(Semaphore::new(concurrency)),
                tasks: TaskTracker::new(),
                running: AtomicBool::new(false),
            }),
            ticker: tokio::sync::Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Refresh the job table immediately and start the periodic tick.
    ///
    /// Calling this while already running is a no-op.
    pub async fn start(&self) {
        let mut ticker = self.ticker.lock().await;
        if ticker.is_some() {
            debug!("Scanner already running");
            return;
        }

        if let Err(e) = self.inner.refresh().await {
            warn!(error = %e, "Initial channel refresh failed; retrying on next tick");
        }

        let cancellation_token = CancellationToken::new();
        let inner = self.inner.clone();
        let token = cancellation_token.clone();
        let tick_interval = self.inner.config.tick_interval;

        self.inner.running.store(true, Ordering::SeqCst);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;

                    _ = token.cancelled() => break,
                    _ = interval.tick() => inner.tick().await,
                }
            }
            debug!("Scanner tick loop stopped");
        });

        *ticker = Some(Ticker {
            cancellation_token,
            handle,
        });

        info!(
            concurrency = self.inner.config.concurrency,
            scan_interval_secs = self.inner.config.scan_interval.as_secs(),
            "Scanner started"
        );
    }

    /// Stop dispatching new checks and wait for in-flight checks to finish
    /// and persist their outcomes.
    ///
    /// Calling this while stopped is a no-op.
    pub async fn stop(&self) {
        let Some(ticker) = self.ticker.lock().await.take() else {
            debug!("Scanner already stopped");
            return;
        };

        self.inner.running.store(false, Ordering::SeqCst);
        ticker.cancellation_token.cancel();
        if let Err(e) = ticker.handle.await {
            warn!(error = %e, "Scanner tick loop ended abnormally");
        }

        let in_flight = self.inner.tasks.len();
        if in_flight > 0 {
            info!(in_flight, "Waiting for in-flight checks");
        }
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
        self.inner.tasks.reopen();
        info!("Scanner stopped");
    }

    /// Refresh the job table and run every due job once, waiting for all of
    /// them. Returns the number of checks dispatched.
    pub async fn run_once(&self) -> Result<usize> {
        self.inner.refresh().await?;
        let handles = self.inner.dispatch_due(None);
        let count = handles.len();

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Check task failed to join");
            }
        }

        info!(count, "Manual scan finished");
        Ok(count)
    }

    /// Snapshot of scanner state and metrics. Never fails.
    pub fn status(&self) -> ScannerStatus {
        let now = Instant::now();
        let (total_jobs, queue_depth, mut processing) = {
            let state = self.inner.state.lock();
            (
                state.jobs.len(),
                state.jobs.values().filter(|job| job.is_due(now)).count(),
                state.processing.iter().cloned().collect::<Vec<_>>(),
            )
        };
        processing.sort();

        ScannerStatus {
            running: self.is_running(),
            concurrency: self.inner.config.concurrency,
            scan_interval_secs: self.inner.config.scan_interval.as_secs(),
            total_jobs,
            queue_depth,
            processing,
            metrics: self.inner.metrics.snapshot(),
            breaker: self.inner.checker.breaker().status(Utc::now()),
        }
    }

    /// One scheduler tick: refresh when due, then dispatch.
    pub async fn tick(&self) {
        self.inner.tick().await;
    }

    /// Reload the channel table now.
    pub async fn refresh(&self) -> Result<()> {
        self.inner.refresh().await
    }

    /// Ids of channels that currently have a job.
    pub fn job_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.state.lock().jobs.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl ScannerInner {
    async fn tick(self: &Arc<Self>) {
        let refresh_due = {
            let state = self.state.lock();
            state
                .last_refresh
                .is_none_or(|at| at.elapsed() >= self.config.refresh_interval)
        };

        if refresh_due && let Err(e) = self.refresh().await {
            warn!(error = %e, "Channel refresh failed; keeping current job table");
        }

        let dispatched = self.dispatch_due(Some(self.config.concurrency)).len();
        if dispatched > 0 {
            debug!(dispatched, "Dispatched due checks");
        }
    }

    /// Reconcile the job table with the enabled channel set.
    ///
    /// New channels are due immediately, vanished channels are dropped, and
    /// surviving jobs keep their schedule with an updated channel snapshot.
    /// The attempt time is stamped up front, so a failing store is retried
    /// once per refresh interval rather than on every tick.
    async fn refresh(&self) -> Result<()> {
        self.state.lock().last_refresh = Some(Instant::now());
        let channels = self.channels.list_enabled().await?;

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let enabled: HashSet<&str> = channels
            .iter()
            .filter(|c| c.enabled)
            .map(|c| c.id.as_str())
            .collect();

        let before = state.jobs.len();
        state.jobs.retain(|id, _| enabled.contains(id.as_str()));
        let removed = before - state.jobs.len();

        let mut added = 0;
        for channel in channels.iter().filter(|c| c.enabled) {
            match state.jobs.get_mut(&channel.id) {
                Some(job) => job.channel = channel.clone(),
                None => {
                    state
                        .jobs
                        .insert(channel.id.clone(), ScannerJob::due_now(channel.clone()));
                    added += 1;
                }
            }
        }

        if added > 0 || removed > 0 {
            info!(
                added,
                removed,
                total = state.jobs.len(),
                "Channel table refreshed"
            );
        }
        Ok(())
    }

    /// Claim due jobs (earliest first) and spawn a check for each.
    ///
    /// With `limit`, stop once that many checks are in flight.
    fn dispatch_due(self: &Arc<Self>, limit: Option<usize>) -> Vec<JoinHandle<()>> {
        let now = Instant::now();
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let mut due: Vec<(Instant, Channel)> = state
            .jobs
            .values()
            .filter(|job| job.is_due(now) && !state.processing.contains(&job.channel.id))
            .map(|job| (job.next_run_at, job.channel.clone()))
            .collect();
        due.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));

        let mut handles = Vec::new();
        for (_, channel) in due {
            if limit.is_some_and(|limit| state.processing.len() >= limit) {
                break;
            }
            state.processing.insert(channel.id.clone());
            handles.push(self.tasks.spawn(self.clone().run_job(channel)));
        }
        handles
    }

    async fn run_job(self: Arc<Self>, channel: Channel) {
        let mut guard = ProcessingGuard {
            inner: self.clone(),
            channel_id: channel.id.clone(),
            next_delay: self.config.scan_interval,
        };

        let Ok(_permit) = self.permits.clone().acquire_owned().await else {
            return;
        };

        match self.checker.run(&channel, self.config.max_retries).await {
            Ok(outcome) => {
                self.metrics.record(&outcome);
                guard.next_delay = next_delay(&outcome, self.config.scan_interval);
            }
            Err(e) => {
                self.metrics.record_unexpected_error();
                error!(channel_id = %channel.id, error = %e, "Channel check failed unexpectedly");
            }
        }
    }
}

/// Cooldown from the outcome when present, otherwise the scan interval.
fn next_delay(outcome: &CheckOutcome, scan_interval: Duration) -> Duration {
    outcome
        .cooldown_secs
        .map(Duration::from_secs)
        .unwrap_or(scan_interval)
}

/// `now + delay`, clamped to a far-future instant on overflow.
fn next_run_at(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay).unwrap_or_else(|| now + FAR_FUTURE)
}

/// Releases a channel from the processing set and schedules its next run.
struct ProcessingGuard {
    inner: Arc<ScannerInner>,
    channel_id: String,
    next_delay: Duration,
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock();
        state.processing.remove(&self.channel_id);
        // The job may have been removed by a refresh while the check ran.
        if let Some(job) = state.jobs.get_mut(&self.channel_id) {
            job.next_run_at = next_run_at(Instant::now(), self.next_delay);
        }
    }
}

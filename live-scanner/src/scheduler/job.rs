//! In-memory scan job.

use tokio::time::Instant;

use crate::domain::Channel;

/// Snapshot of a channel plus the time it is next due.
#[derive(Debug, Clone)]
pub struct ScannerJob {
    pub channel: Channel,
    pub next_run_at: Instant,
}

impl ScannerJob {
    /// A job that is due immediately.
    pub fn due_now(channel: Channel) -> Self {
        Self {
            channel,
            next_run_at: Instant::now(),
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_run_at <= now
    }
}

//! Scanner scheduling.
//!
//! The Scanner keeps an in-memory table of per-channel next-run times, ticks
//! on a fixed cadence, and dispatches due channels to the `ChannelChecker`
//! under a global concurrency cap. The table is rebuilt from storage on
//! every refresh and is never persisted.

mod job;
mod metrics;
mod service;

pub use job::ScannerJob;
pub use metrics::{ScanMetrics, ScanMetricsSnapshot};
pub use service::{Scanner, SchedulerConfig, ScannerStatus};

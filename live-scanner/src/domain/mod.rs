//! Domain layer.
//!
//! Channels to scan, per-check outcomes, and the persisted status/history shapes.

pub mod channel;
pub mod check;
pub mod status;

pub use channel::{Channel, live_url_for};
pub use check::{CheckOutcome, CheckResult, StreamFormat};
pub use status::{ChannelStatus, CheckHistoryEntry};

//! Repository layer.
//!
//! The scanner depends only on the traits; SQLx implementations back them in
//! the binary.

pub mod channel;
pub mod history;
pub mod status;

pub use channel::{ChannelRepository, SqlxChannelRepository};
pub use history::{HistoryRepository, SqlxHistoryRepository};
pub use status::{SqlxStatusRepository, StatusRepository};

//! Database row models.

pub mod channel;
pub mod history;
pub mod status;

pub use channel::ChannelDbModel;
pub use history::CheckHistoryDbModel;
pub use status::ChannelStatusDbModel;

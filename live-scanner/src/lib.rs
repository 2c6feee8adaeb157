//! live-scanner library crate.
//!
//! Continuously checks a set of monitored channels for live broadcasts,
//! resolves a playable stream address, validates it and records the outcome.

pub mod config;
pub mod database;
pub mod domain;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod scheduler;
pub mod utils;

pub use error::{Error, Result};

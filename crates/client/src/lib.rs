//! # cordsync Client
//!
//! Ties the workspace together: a [`Client`] owns the cache, reconciles raw
//! gateway events through the action dispatcher, publishes notifications on
//! its event bus and owns every timer and collector task it starts.

pub mod client;
pub mod replay;
pub mod timers;

pub use client::Client;
pub use replay::{RecordedEvent, ReplayError, parse_log, read_log};
pub use timers::{TimerId, TimerSet};

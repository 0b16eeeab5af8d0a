//! Gateway event actions for cordsync.
//!
//! Each raw gateway event is handled by one [`Action`]. An action reads the
//! payload, reconciles the [`ClientCache`](cordsync_core::ClientCache) and
//! reports what changed as [`Notification`](cordsync_core::Notification)s.
//! The [`ActionDispatcher`] routes events to their action and turns
//! malformed payloads into warnings instead of errors.

pub mod action;
pub mod gateway;
pub mod resolver;
pub mod registry;

pub mod channel;
pub mod emoji;
pub mod guild;
pub mod message;
pub mod reaction;
pub mod user;

#[cfg(test)]
mod test_helpers;

pub use action::{Action, ActionContext};
pub use emoji::sync_emojis;
pub use gateway::GatewayEvent;
pub use registry::ActionDispatcher;
pub use resolver::{ResolveOptions, Resolved, resolve_or_create};

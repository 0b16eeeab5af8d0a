//! Collectors for cordsync.
//!
//! A collector subscribes to the notification bus and accumulates the
//! notifications that concern it until a stop condition ends it: an explicit
//! stop, an absolute timeout, an idle timeout or a limit checked after each
//! event. The [`Collector`] engine owns the lifecycle once; concrete kinds
//! implement [`CollectorHandler`].

pub mod collector;
pub mod handler;
pub mod message;
pub mod options;
pub mod reaction;
pub mod reason;

pub use collector::{Collector, CollectorEnded, CollectorEvent, CollectorHandle, Outcome};
pub use handler::{Collection, CollectorHandler, Handled};
pub use message::MessageCollector;
pub use options::CollectorOptions;
pub use reaction::{ReactionCollector, ReactionItem};
pub use reason::EndReason;

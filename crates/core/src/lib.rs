//! # cordsync Core
//!
//! Entity model, cache stores, notifications and error definitions for the
//! cordsync client core. Every other crate in the workspace depends inward
//! on this one:
//! - `cordsync-actions` mutates a [`ClientCache`] and produces [`Notification`]s
//! - `cordsync-collectors` consumes notifications from an [`EventBus`]
//! - `cordsync-client` wires both to a transport

pub mod error;
pub mod snowflake;
pub mod entity;
pub mod store;
pub mod user;
pub mod emoji;
pub mod guild;
pub mod channel;
pub mod message;
pub mod reaction;
pub mod cache;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{CollectorError, PayloadError};
pub use snowflake::Snowflake;
pub use entity::{Entity, PartialKind};
pub use store::CacheStore;
pub use user::User;
pub use emoji::Emoji;
pub use guild::Guild;
pub use channel::{Channel, ChannelKind};
pub use message::Message;
pub use reaction::{Reaction, ReactionEmoji};
pub use cache::{CacheOptions, ClientCache};
pub use event::{EventBus, Notification};

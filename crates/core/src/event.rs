//! Notification system: what reconciliation tells the rest of the process.
//!
//! Actions produce notifications when cached state changes. They are
//! published on the [`EventBus`] in the order the raw events arrived;
//! application code and collectors subscribe to react.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::channel::Channel;
use crate::emoji::Emoji;
use crate::guild::Guild;
use crate::message::Message;
use crate::reaction::Reaction;
use crate::snowflake::Snowflake;
use crate::user::User;

/// All notifications emitted by the reconciliation layer.
///
/// Entities are snapshots taken at emission time; `old` is the state before
/// the change was applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// The session is ready and the current user is known
    Ready { user: User },

    GuildCreate { guild: Guild },
    GuildUpdate { old: Guild, new: Guild },
    GuildDelete { guild: Guild },
    /// A cached guild went through an outage
    GuildUnavailable { guild: Guild },

    ChannelCreate { channel: Channel },
    ChannelUpdate { old: Channel, new: Channel },
    ChannelDelete { channel: Channel },

    EmojiCreate { emoji: Emoji },
    EmojiUpdate { old: Emoji, new: Emoji },
    EmojiDelete { emoji: Emoji },

    MessageCreate { message: Message },
    MessageUpdate { old: Message, new: Message },
    MessageDelete { message: Message },
    MessageDeleteBulk {
        channel_id: Snowflake,
        messages: Vec<Message>,
    },

    ReactionAdd { reaction: Reaction, user: User },
    ReactionRemove { reaction: Reaction, user: User },
    ReactionRemoveAll { message: Message },
    ReactionRemoveEmoji { reaction: Reaction },

    UserUpdate { old: User, new: User },

    /// Diagnostic: something was ignored on purpose
    Debug { message: String },
    /// Diagnostic: a payload was malformed or referenced uncached state
    Warn { message: String },
}

impl Notification {
    /// Stable event name, used for logging and the CLI.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "ready",
            Self::GuildCreate { .. } => "guild_create",
            Self::GuildUpdate { .. } => "guild_update",
            Self::GuildDelete { .. } => "guild_delete",
            Self::GuildUnavailable { .. } => "guild_unavailable",
            Self::ChannelCreate { .. } => "channel_create",
            Self::ChannelUpdate { .. } => "channel_update",
            Self::ChannelDelete { .. } => "channel_delete",
            Self::EmojiCreate { .. } => "emoji_create",
            Self::EmojiUpdate { .. } => "emoji_update",
            Self::EmojiDelete { .. } => "emoji_delete",
            Self::MessageCreate { .. } => "message_create",
            Self::MessageUpdate { .. } => "message_update",
            Self::MessageDelete { .. } => "message_delete",
            Self::MessageDeleteBulk { .. } => "message_delete_bulk",
            Self::ReactionAdd { .. } => "reaction_add",
            Self::ReactionRemove { .. } => "reaction_remove",
            Self::ReactionRemoveAll { .. } => "reaction_remove_all",
            Self::ReactionRemoveEmoji { .. } => "reaction_remove_emoji",
            Self::UserUpdate { .. } => "user_update",
            Self::Debug { .. } => "debug",
            Self::Warn { .. } => "warn",
        }
    }

    pub fn is_diagnostic(&self) -> bool {
        matches!(self, Self::Debug { .. } | Self::Warn { .. })
    }
}

/// A broadcast-based event bus for notifications.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
/// Each subscriber holds one receiver; dropping it detaches the subscriber.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Arc<Notification>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish a notification to all subscribers.
    pub fn publish(&self, notification: Arc<Notification>) {
        // No subscribers is fine
        let _ = self.sender.send(notification);
    }

    /// Subscribe to receive notifications published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Notification>> {
        self.sender.subscribe()
    }

    /// Number of attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

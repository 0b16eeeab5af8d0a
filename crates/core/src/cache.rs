//! The client-wide cache: every store the reconciliation layer mutates.

use std::collections::HashSet;

use crate::channel::Channel;
use crate::entity::PartialKind;
use crate::guild::Guild;
use crate::message::Message;
use crate::snowflake::Snowflake;
use crate::store::CacheStore;
use crate::user::User;

/// Resolver settings shared by every action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    /// Kinds that may be materialized as stubs when absent from the cache.
    pub partials: HashSet<PartialKind>,
    /// Per-channel message limit; `None` is unbounded, `Some(0)` disables.
    pub message_cache_max_size: Option<usize>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            partials: HashSet::new(),
            message_cache_max_size: Some(200),
        }
    }
}

impl CacheOptions {
    pub fn allows(&self, kind: PartialKind) -> bool {
        self.partials.contains(&kind)
    }

    pub fn with_partials(mut self, kinds: impl IntoIterator<Item = PartialKind>) -> Self {
        self.partials.extend(kinds);
        self
    }
}

/// Global stores owned by the client. Guilds own their emojis, channels
/// own their messages, messages own their reactions.
#[derive(Debug, Clone, Default)]
pub struct ClientCache {
    /// The logged-in user, set by `READY`.
    pub current_user: Option<User>,
    pub users: CacheStore<User>,
    pub guilds: CacheStore<Guild>,
    pub channels: CacheStore<Channel>,
}

impl ClientCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_user_id(&self) -> Option<Snowflake> {
        self.current_user.as_ref().map(|u| u.id)
    }

    pub fn message(&self, channel_id: Snowflake, message_id: Snowflake) -> Option<&Message> {
        self.channels.get(&channel_id)?.messages.get(&message_id)
    }

    pub fn message_mut(&mut self, channel_id: Snowflake, message_id: Snowflake) -> Option<&mut Message> {
        self.channels.get_mut(&channel_id)?.messages.get_mut(&message_id)
    }

    /// Insert a channel and index it under its guild, if that guild is cached.
    pub fn insert_channel(&mut self, channel: Channel) -> Option<Channel> {
        if let Some(guild) = channel.guild_id.and_then(|id| self.guilds.get_mut(&id)) {
            guild.channels.insert(channel.id);
        }
        self.channels.insert(channel)
    }

    /// Remove a channel from the global store and its guild's index.
    pub fn remove_channel(&mut self, channel_id: Snowflake) -> Option<Channel> {
        let channel = self.channels.remove(&channel_id)?;
        if let Some(guild) = channel.guild_id.and_then(|id| self.guilds.get_mut(&id)) {
            guild.channels.shift_remove(&channel_id);
        }
        Some(channel)
    }

    /// Drop messages whose last activity is older than `cutoff_ms` (Unix ms).
    pub fn sweep_messages(&mut self, cutoff_ms: i64) -> usize {
        self.channels
            .values_mut()
            .map(|channel| {
                channel
                    .messages
                    .retain(|message| message.last_activity().timestamp_millis() >= cutoff_ms)
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_index_follows_guild() {
        let mut cache = ClientCache::new();
        cache.guilds.insert(Guild::unavailable(Snowflake(1)));
        cache.insert_channel(Channel::partial(Snowflake(2), Some(Snowflake(1)), None));
        assert!(cache.guilds.get(&Snowflake(1)).unwrap().channels.contains(&Snowflake(2)));

        cache.remove_channel(Snowflake(2));
        assert!(cache.guilds.get(&Snowflake(1)).unwrap().channels.is_empty());
        assert!(cache.channels.is_empty());
    }

    #[test]
    fn sweep_drops_old_messages() {
        let mut cache = ClientCache::new();
        let mut channel = Channel::partial(Snowflake(2), None, None);
        channel.messages.insert(Message::partial(Snowflake::from_timestamp_ms(1_500_000_000_000), Snowflake(2), None));
        channel.messages.insert(Message::partial(Snowflake::from_timestamp_ms(1_700_000_000_000), Snowflake(2), None));
        cache.insert_channel(channel);

        let removed = cache.sweep_messages(1_600_000_000_000);
        assert_eq!(removed, 1);
        assert_eq!(cache.channels.get(&Snowflake(2)).unwrap().messages.len(), 1);
    }

    #[test]
    fn default_options_allow_no_partials() {
        let options = CacheOptions::default();
        assert!(!options.allows(PartialKind::Message));
        let options = options.with_partials([PartialKind::Message]);
        assert!(options.allows(PartialKind::Message));
    }
}

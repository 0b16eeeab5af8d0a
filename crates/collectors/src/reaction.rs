//! Collects reactions added to one message.

use std::collections::HashSet;

use cordsync_core::{CollectorError, Entity, Message, Notification, Reaction, Snowflake, User};
use indexmap::IndexMap;
use serde::Serialize;

use crate::handler::{Collection, CollectorHandler, Handled};
use crate::options::positive;
use crate::reason::EndReason;

/// A reaction event as filters and listeners see it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReactionItem {
    pub reaction: Reaction,
    pub user: User,
}

/// Reactions are keyed by emoji identifier, so each emoji is collected once
/// no matter how many users react with it.
#[derive(Debug, Clone)]
pub struct ReactionCollector {
    message_id: Snowflake,
    channel_id: Snowflake,
    guild_id: Option<Snowflake>,
    /// End after this many reactions in total.
    max: Option<usize>,
    /// End after this many distinct emojis.
    max_emojis: Option<usize>,
    /// End after this many distinct users.
    max_users: Option<usize>,
    total: usize,
    /// Users that reacted, with the emoji keys each one still holds.
    users: IndexMap<Snowflake, (User, HashSet<String>)>,
}

impl ReactionCollector {
    pub fn new(message_id: Snowflake, channel_id: Snowflake, guild_id: Option<Snowflake>) -> Self {
        Self {
            message_id,
            channel_id,
            guild_id,
            max: None,
            max_emojis: None,
            max_users: None,
            total: 0,
            users: IndexMap::new(),
        }
    }

    pub fn for_message(message: &Message) -> Self {
        Self::new(message.id, message.channel_id, message.guild_id)
    }

    pub fn with_max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    pub fn with_max_emojis(mut self, max_emojis: usize) -> Self {
        self.max_emojis = Some(max_emojis);
        self
    }

    pub fn with_max_users(mut self, max_users: usize) -> Self {
        self.max_users = Some(max_users);
        self
    }

    pub fn message_id(&self) -> Snowflake {
        self.message_id
    }

    /// Reactions collected so far, minus the ones taken back.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values().map(|(user, _)| user)
    }

    fn holds(&self, user_id: Snowflake, key: &str) -> bool {
        self.users.get(&user_id).is_some_and(|(_, keys)| keys.contains(key))
    }
}

impl CollectorHandler for ReactionCollector {
    type Key = String;
    type Value = Reaction;
    type Item = ReactionItem;

    fn handle(
        &mut self,
        notification: &Notification,
        collected: &Collection<String, Reaction>,
    ) -> Vec<Handled<String, Reaction, ReactionItem>> {
        match notification {
            Notification::ReactionAdd { reaction, user } if reaction.message_id == self.message_id => {
                vec![Handled::Collect {
                    key: reaction.key(),
                    value: reaction.clone(),
                    item: ReactionItem {
                        reaction: reaction.clone(),
                        user: user.clone(),
                    },
                }]
            }
            Notification::ReactionRemove { reaction, user } if reaction.message_id == self.message_id => {
                let key = reaction.key();
                let notify = collected.contains_key(&key) && self.holds(user.id, &key);
                vec![Handled::Remove {
                    item: ReactionItem {
                        reaction: reaction.clone(),
                        user: user.clone(),
                    },
                    dispose: (reaction.count == 0).then_some(key),
                    notify,
                }]
            }
            Notification::ReactionRemoveAll { message } if message.id == self.message_id => vec![Handled::Empty],
            Notification::MessageDelete { message } if message.id == self.message_id => {
                vec![Handled::End(EndReason::MessageDelete)]
            }
            Notification::MessageDeleteBulk { messages, .. } if messages.iter().any(|m| m.id == self.message_id) => {
                vec![Handled::End(EndReason::MessageDelete)]
            }
            Notification::ChannelDelete { channel } if channel.id == self.channel_id => {
                vec![Handled::End(EndReason::ChannelDelete)]
            }
            Notification::GuildDelete { guild } if Some(guild.id) == self.guild_id => {
                vec![Handled::End(EndReason::GuildDelete)]
            }
            _ => Vec::new(),
        }
    }

    fn post_check(&self, collected: &Collection<String, Reaction>, _received: usize) -> Option<EndReason> {
        if self.max.is_some_and(|max| self.total >= max) {
            return Some(EndReason::Limit);
        }
        if self.max_emojis.is_some_and(|max| collected.len() >= max) {
            return Some(EndReason::EmojiLimit);
        }
        if self.max_users.is_some_and(|max| self.users.len() >= max) {
            return Some(EndReason::UserLimit);
        }
        None
    }

    fn validate(&self) -> Result<(), CollectorError> {
        positive("max", self.max)?;
        positive("max_emojis", self.max_emojis)?;
        positive("max_users", self.max_users)
    }

    fn on_collect(&mut self, item: &ReactionItem) {
        self.total += 1;
        self.users
            .entry(item.user.id)
            .or_insert_with(|| (item.user.clone(), HashSet::new()))
            .1
            .insert(item.reaction.key());
    }

    fn on_remove(&mut self, item: &ReactionItem) {
        self.total = self.total.saturating_sub(1);
        let key = item.reaction.key();
        let emptied = match self.users.get_mut(&item.user.id) {
            Some((_, keys)) => {
                keys.remove(&key);
                keys.is_empty()
            }
            None => false,
        };
        if emptied {
            self.users.shift_remove(&item.user.id);
        }
    }

    fn on_empty(&mut self) {
        self.total = 0;
        self.users.clear();
    }

    fn cleanup(&mut self) {
        tracing::debug!(message = %self.message_id, users = self.users.len(), "Reaction collector detached");
        self.users.clear();
    }
}

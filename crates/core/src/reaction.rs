//! Message reactions.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::{Entity, parse, require};
use crate::error::PayloadError;
use crate::snowflake::Snowflake;

/// The emoji a reaction was made with: a custom emoji (with id) or a
/// unicode emoji (name only).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReactionEmoji {
    pub id: Option<Snowflake>,
    pub name: Option<String>,
    #[serde(default)]
    pub animated: bool,
}

impl ReactionEmoji {
    pub fn unicode(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
            animated: false,
        }
    }

    /// Key a reaction is stored under: the custom emoji id, else the name.
    pub fn identifier(&self) -> String {
        match (self.id, &self.name) {
            (Some(id), _) => id.to_string(),
            (None, Some(name)) => name.clone(),
            (None, None) => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reaction {
    pub message_id: Snowflake,
    pub emoji: ReactionEmoji,
    pub count: u32,
    /// Whether the current user is among the reactors.
    pub me: bool,
    /// Users known to have reacted; may be smaller than `count`.
    pub users: IndexSet<Snowflake>,
    pub partial: bool,
}

#[derive(Deserialize)]
struct RawReaction {
    emoji: Option<ReactionEmoji>,
    count: Option<u32>,
    me: Option<bool>,
}

impl Reaction {
    pub fn from_raw(message_id: Snowflake, raw: &Value) -> Result<Self, PayloadError> {
        let parsed: RawReaction = parse(Self::NAME, raw)?;
        let emoji = require(Self::NAME, "emoji", parsed.emoji)?;
        if emoji.id.is_none() && emoji.name.is_none() {
            return Err(PayloadError::MissingField {
                entity: Self::NAME,
                field: "emoji.name",
            });
        }
        Ok(Self {
            message_id,
            emoji,
            count: parsed.count.unwrap_or(0),
            me: parsed.me.unwrap_or(false),
            users: IndexSet::new(),
            partial: false,
        })
    }

    /// A fresh reaction with no reactors yet.
    pub fn new(message_id: Snowflake, emoji: ReactionEmoji) -> Self {
        Self {
            message_id,
            emoji,
            count: 0,
            me: false,
            users: IndexSet::new(),
            partial: false,
        }
    }

    /// A reaction on a message whose reaction counts are unknown.
    pub fn partial(message_id: Snowflake, emoji: ReactionEmoji) -> Self {
        Self {
            message_id,
            emoji,
            count: 0,
            me: false,
            users: IndexSet::new(),
            partial: true,
        }
    }

    /// Record `user_id` as a reactor. No-op on partial reactions.
    pub fn add_user(&mut self, user_id: Snowflake, current_user: Option<Snowflake>) {
        if self.partial {
            return;
        }
        let is_me = current_user == Some(user_id);
        if !self.users.insert(user_id) {
            return;
        }
        if !self.me || !is_me || self.count == 0 {
            self.count += 1;
        }
        if !self.me {
            self.me = is_me;
        }
    }

    /// Forget `user_id` as a reactor. No-op on partial reactions.
    pub fn remove_user(&mut self, user_id: Snowflake, current_user: Option<Snowflake>) {
        if self.partial {
            return;
        }
        let is_me = current_user == Some(user_id);
        self.users.shift_remove(&user_id);
        self.count = self.count.saturating_sub(1);
        if is_me {
            self.me = false;
        }
    }

    /// Whether nothing is left of this reaction.
    pub fn is_empty(&self) -> bool {
        self.count == 0 && self.users.is_empty()
    }
}

impl Entity for Reaction {
    type Key = String;
    const NAME: &'static str = "reaction";

    fn key(&self) -> String {
        self.emoji.identifier()
    }

    fn patch(&mut self, raw: &Value) -> Result<(), PayloadError> {
        let parsed: RawReaction = parse(Self::NAME, raw)?;
        if let Some(count) = parsed.count {
            self.count = count;
            self.partial = false;
        }
        if let Some(me) = parsed.me {
            self.me = me;
        }
        Ok(())
    }

    fn is_partial(&self) -> bool {
        self.partial
    }
}

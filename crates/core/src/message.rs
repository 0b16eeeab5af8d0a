//! Messages and their reaction caches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::{Entity, nullable, parse, require};
use crate::error::PayloadError;
use crate::reaction::Reaction;
use crate::snowflake::Snowflake;
use crate::store::CacheStore;

/// A message. A message is partial until both its content and author are
/// known.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    pub guild_id: Option<Snowflake>,
    pub author_id: Option<Snowflake>,
    pub content: Option<String>,
    pub edited_timestamp: Option<DateTime<Utc>>,
    pub pinned: bool,
    pub tts: bool,
    pub reactions: CacheStore<Reaction>,
    pub partial: bool,
    pub deleted: bool,
}

#[derive(Deserialize)]
struct AuthorRef {
    id: Snowflake,
}

#[derive(Deserialize)]
struct RawMessage {
    id: Option<Snowflake>,
    channel_id: Option<Snowflake>,
    guild_id: Option<Snowflake>,
    author: Option<AuthorRef>,
    content: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    edited_timestamp: Option<Option<DateTime<Utc>>>,
    pinned: Option<bool>,
    tts: Option<bool>,
}

impl Message {
    /// Build a message from a payload. `channel_id` and `guild_id` are used
    /// when the payload omits them.
    pub fn from_raw(raw: &Value, channel_id: Snowflake, guild_id: Option<Snowflake>) -> Result<Self, PayloadError> {
        let parsed: RawMessage = parse(Self::NAME, raw)?;
        let id = require(Self::NAME, "id", parsed.id)?;
        let mut message = Self::partial(id, parsed.channel_id.unwrap_or(channel_id), guild_id);
        message.apply(parsed);

        if let Some(reactions) = raw.get("reactions").and_then(Value::as_array) {
            for raw_reaction in reactions {
                match Reaction::from_raw(id, raw_reaction) {
                    Ok(reaction) => {
                        message.reactions.insert(reaction);
                    }
                    Err(e) => tracing::warn!(message = %id, error = %e, "Skipping malformed reaction"),
                }
            }
        }
        Ok(message)
    }

    /// A stub carrying only ids.
    pub fn partial(id: Snowflake, channel_id: Snowflake, guild_id: Option<Snowflake>) -> Self {
        Self {
            id,
            channel_id,
            guild_id,
            author_id: None,
            content: None,
            edited_timestamp: None,
            pinned: false,
            tts: false,
            reactions: CacheStore::new(),
            partial: true,
            deleted: false,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.id.created_at()
    }

    /// Most recent moment this message changed: its edit, else its creation.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.edited_timestamp.unwrap_or_else(|| self.created_at())
    }

    fn apply(&mut self, raw: RawMessage) {
        if raw.guild_id.is_some() {
            self.guild_id = raw.guild_id;
        }
        if let Some(author) = raw.author {
            self.author_id = Some(author.id);
        }
        if raw.content.is_some() {
            self.content = raw.content;
        }
        if let Some(edited) = raw.edited_timestamp {
            self.edited_timestamp = edited;
        }
        if let Some(pinned) = raw.pinned {
            self.pinned = pinned;
        }
        if let Some(tts) = raw.tts {
            self.tts = tts;
        }
        self.partial = self.content.is_none() || self.author_id.is_none();
    }
}

impl Entity for Message {
    type Key = Snowflake;
    const NAME: &'static str = "message";

    fn key(&self) -> Snowflake {
        self.id
    }

    fn patch(&mut self, raw: &Value) -> Result<(), PayloadError> {
        let parsed: RawMessage = parse(Self::NAME, raw)?;
        self.apply(parsed);
        Ok(())
    }

    fn is_partial(&self) -> bool {
        self.partial
    }
}

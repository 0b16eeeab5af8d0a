//! Channels: guild channels, DMs and group DMs.
//!
//! Text-capable channels own a bounded message store sized by
//! `CacheOptions::message_cache_max_size`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::{Entity, nullable, parse, require};
use crate::error::PayloadError;
use crate::message::Message;
use crate::snowflake::Snowflake;
use crate::store::CacheStore;

/// Channel type as sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum ChannelKind {
    GuildText,
    Dm,
    GuildVoice,
    GroupDm,
    GuildCategory,
    GuildNews,
    GuildStore,
    Unknown(u8),
}

impl From<u8> for ChannelKind {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::GuildText,
            1 => Self::Dm,
            2 => Self::GuildVoice,
            3 => Self::GroupDm,
            4 => Self::GuildCategory,
            5 => Self::GuildNews,
            6 => Self::GuildStore,
            other => Self::Unknown(other),
        }
    }
}

impl From<ChannelKind> for u8 {
    fn from(kind: ChannelKind) -> Self {
        match kind {
            ChannelKind::GuildText => 0,
            ChannelKind::Dm => 1,
            ChannelKind::GuildVoice => 2,
            ChannelKind::GroupDm => 3,
            ChannelKind::GuildCategory => 4,
            ChannelKind::GuildNews => 5,
            ChannelKind::GuildStore => 6,
            ChannelKind::Unknown(other) => other,
        }
    }
}

impl ChannelKind {
    /// Whether messages can be sent in (and cached for) this channel.
    pub fn is_text_based(&self) -> bool {
        matches!(self, Self::GuildText | Self::Dm | Self::GroupDm | Self::GuildNews)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Channel {
    pub id: Snowflake,
    pub kind: ChannelKind,
    pub guild_id: Option<Snowflake>,
    pub name: Option<String>,
    pub topic: Option<String>,
    pub position: Option<i64>,
    pub nsfw: bool,
    pub last_message_id: Option<Snowflake>,
    pub messages: CacheStore<Message>,
    pub partial: bool,
    pub deleted: bool,
}

#[derive(Deserialize)]
struct RawChannel {
    id: Option<Snowflake>,
    #[serde(rename = "type")]
    kind: Option<ChannelKind>,
    guild_id: Option<Snowflake>,
    name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    topic: Option<Option<String>>,
    position: Option<i64>,
    nsfw: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    last_message_id: Option<Option<Snowflake>>,
}

impl Channel {
    /// Build a channel from a payload. `guild_id` fills in the owning guild
    /// when the payload is nested inside a guild and omits it.
    pub fn from_raw(
        raw: &Value,
        guild_id: Option<Snowflake>,
        message_cache_max_size: Option<usize>,
    ) -> Result<Self, PayloadError> {
        let parsed: RawChannel = parse(Self::NAME, raw)?;
        let id = require(Self::NAME, "id", parsed.id)?;
        let mut channel = Self::partial(id, guild_id, message_cache_max_size);
        channel.partial = false;
        channel.apply(parsed);
        Ok(channel)
    }

    /// A stub materialized from event context alone.
    pub fn partial(id: Snowflake, guild_id: Option<Snowflake>, message_cache_max_size: Option<usize>) -> Self {
        Self {
            id,
            kind: if guild_id.is_some() {
                ChannelKind::GuildText
            } else {
                ChannelKind::Dm
            },
            guild_id,
            name: None,
            topic: None,
            position: None,
            nsfw: false,
            last_message_id: None,
            messages: CacheStore::with_max_size(message_cache_max_size),
            partial: true,
            deleted: false,
        }
    }

    fn apply(&mut self, raw: RawChannel) {
        if let Some(kind) = raw.kind {
            self.kind = kind;
        }
        if raw.guild_id.is_some() {
            self.guild_id = raw.guild_id;
        }
        if raw.name.is_some() {
            self.name = raw.name;
        }
        if let Some(topic) = raw.topic {
            self.topic = topic;
        }
        if raw.position.is_some() {
            self.position = raw.position;
        }
        if let Some(nsfw) = raw.nsfw {
            self.nsfw = nsfw;
        }
        if let Some(last_message_id) = raw.last_message_id {
            self.last_message_id = last_message_id;
        }
    }
}

impl Entity for Channel {
    type Key = Snowflake;
    const NAME: &'static str = "channel";

    fn key(&self) -> Snowflake {
        self.id
    }

    fn patch(&mut self, raw: &Value) -> Result<(), PayloadError> {
        let parsed: RawChannel = parse(Self::NAME, raw)?;
        self.apply(parsed);
        Ok(())
    }

    fn is_partial(&self) -> bool {
        self.partial
    }
}

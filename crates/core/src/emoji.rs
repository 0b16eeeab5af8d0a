//! Guild emojis.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::{Entity, parse, require};
use crate::error::PayloadError;
use crate::snowflake::Snowflake;

/// A custom emoji owned by a guild.
///
/// Every field is part of equality; a change to `animated`, `available` or the
/// role list counts as an update during list synchronization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Emoji {
    pub id: Snowflake,
    pub guild_id: Snowflake,
    pub name: Option<String>,
    pub animated: bool,
    pub available: bool,
    pub managed: bool,
    pub require_colons: bool,
    pub roles: Vec<Snowflake>,
}

#[derive(Deserialize)]
struct RawEmoji {
    id: Option<Snowflake>,
    name: Option<String>,
    animated: Option<bool>,
    available: Option<bool>,
    managed: Option<bool>,
    require_colons: Option<bool>,
    roles: Option<Vec<Snowflake>>,
}

impl Emoji {
    pub fn from_raw(guild_id: Snowflake, raw: &Value) -> Result<Self, PayloadError> {
        let parsed: RawEmoji = parse(Self::NAME, raw)?;
        let mut emoji = Self {
            id: require(Self::NAME, "id", parsed.id)?,
            guild_id,
            name: None,
            animated: false,
            available: true,
            managed: false,
            require_colons: true,
            roles: Vec::new(),
        };
        emoji.apply(parsed);
        Ok(emoji)
    }

    /// `<:name:id>` / `<a:name:id>` as it appears in message content.
    pub fn mention(&self) -> String {
        let prefix = if self.animated { "a" } else { "" };
        format!("<{prefix}:{}:{}>", self.name.as_deref().unwrap_or("_"), self.id)
    }

    fn apply(&mut self, raw: RawEmoji) {
        if raw.name.is_some() {
            self.name = raw.name;
        }
        if let Some(animated) = raw.animated {
            self.animated = animated;
        }
        if let Some(available) = raw.available {
            self.available = available;
        }
        if let Some(managed) = raw.managed {
            self.managed = managed;
        }
        if let Some(require_colons) = raw.require_colons {
            self.require_colons = require_colons;
        }
        if let Some(roles) = raw.roles {
            self.roles = roles;
        }
    }
}

impl Entity for Emoji {
    type Key = Snowflake;
    const NAME: &'static str = "emoji";

    fn key(&self) -> Snowflake {
        self.id
    }

    fn patch(&mut self, raw: &Value) -> Result<(), PayloadError> {
        let parsed: RawEmoji = parse(Self::NAME, raw)?;
        self.apply(parsed);
        Ok(())
    }
}

//! Guilds and the caches they own.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::emoji::Emoji;
use crate::entity::{Entity, nullable, parse, require};
use crate::error::PayloadError;
use crate::snowflake::Snowflake;
use crate::store::CacheStore;

/// A guild. Owns its emoji store and the ids of its channels; the channels
/// themselves live in the client-wide channel store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Guild {
    pub id: Snowflake,
    pub name: Option<String>,
    pub icon: Option<String>,
    pub owner_id: Option<Snowflake>,
    pub member_count: Option<u64>,
    pub unavailable: bool,
    pub emojis: CacheStore<Emoji>,
    pub channels: IndexSet<Snowflake>,
}

#[derive(Deserialize)]
struct RawGuild {
    id: Option<Snowflake>,
    name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    icon: Option<Option<String>>,
    owner_id: Option<Snowflake>,
    member_count: Option<u64>,
    unavailable: Option<bool>,
}

impl Guild {
    /// Build a guild from its scalar fields. Channels and emojis in the payload
    /// are reconciled separately by the caller.
    pub fn from_raw(raw: &Value) -> Result<Self, PayloadError> {
        let parsed: RawGuild = parse(Self::NAME, raw)?;
        let mut guild = Self::unavailable(require(Self::NAME, "id", parsed.id)?);
        guild.unavailable = false;
        guild.apply(parsed);
        Ok(guild)
    }

    /// A guild known only by id, as announced in `READY` or an outage.
    pub fn unavailable(id: Snowflake) -> Self {
        Self {
            id,
            name: None,
            icon: None,
            owner_id: None,
            member_count: None,
            unavailable: true,
            emojis: CacheStore::new(),
            channels: IndexSet::new(),
        }
    }

    pub fn available(&self) -> bool {
        !self.unavailable
    }

    fn apply(&mut self, raw: RawGuild) {
        if raw.name.is_some() {
            self.name = raw.name;
        }
        if let Some(icon) = raw.icon {
            self.icon = icon;
        }
        if raw.owner_id.is_some() {
            self.owner_id = raw.owner_id;
        }
        if raw.member_count.is_some() {
            self.member_count = raw.member_count;
        }
        if let Some(unavailable) = raw.unavailable {
            self.unavailable = unavailable;
        }
    }
}

impl Entity for Guild {
    type Key = Snowflake;
    const NAME: &'static str = "guild";

    fn key(&self) -> Snowflake {
        self.id
    }

    fn patch(&mut self, raw: &Value) -> Result<(), PayloadError> {
        let parsed: RawGuild = parse(Self::NAME, raw)?;
        self.apply(parsed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_raw_is_available() {
        let guild = Guild::from_raw(&json!({"id": "1", "name": "Rust", "member_count": 3})).unwrap();
        assert!(guild.available());
        assert_eq!(guild.member_count, Some(3));
        assert!(guild.emojis.is_empty());
    }

    #[test]
    fn unavailable_flag_is_patched() {
        let mut guild = Guild::from_raw(&json!({"id": "1"})).unwrap();
        guild.patch(&json!({"unavailable": true})).unwrap();
        assert!(!guild.available());
    }

    #[test]
    fn patch_leaves_absent_fields() {
        let mut guild = Guild::from_raw(&json!({"id": "1", "name": "Rust", "icon": "i"})).unwrap();
        guild.patch(&json!({"member_count": 9})).unwrap();
        assert_eq!(guild.name.as_deref(), Some("Rust"));
        assert_eq!(guild.icon.as_deref(), Some("i"));
    }
}

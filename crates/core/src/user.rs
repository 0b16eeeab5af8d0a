//! Users.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::{Entity, nullable, parse, require};
use crate::error::PayloadError;
use crate::snowflake::Snowflake;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: Snowflake,
    pub username: Option<String>,
    pub discriminator: Option<String>,
    pub avatar: Option<String>,
    pub bot: bool,
    pub partial: bool,
}

#[derive(Deserialize)]
struct RawUser {
    id: Option<Snowflake>,
    username: Option<String>,
    discriminator: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    avatar: Option<Option<String>>,
    bot: Option<bool>,
}

impl User {
    pub fn from_raw(raw: &Value) -> Result<Self, PayloadError> {
        let parsed: RawUser = parse(Self::NAME, raw)?;
        let mut user = Self::partial(require(Self::NAME, "id", parsed.id)?);
        user.apply(parsed);
        Ok(user)
    }

    /// A stub carrying only the id.
    pub fn partial(id: Snowflake) -> Self {
        Self {
            id,
            username: None,
            discriminator: None,
            avatar: None,
            bot: false,
            partial: true,
        }
    }

    /// `username#discriminator`, when known.
    pub fn tag(&self) -> Option<String> {
        match (&self.username, &self.discriminator) {
            (Some(name), Some(disc)) => Some(format!("{name}#{disc}")),
            _ => None,
        }
    }

    fn apply(&mut self, raw: RawUser) {
        if let Some(username) = raw.username {
            self.username = Some(username);
            self.partial = false;
        }
        if let Some(discriminator) = raw.discriminator {
            self.discriminator = Some(discriminator);
        }
        if let Some(avatar) = raw.avatar {
            self.avatar = avatar;
        }
        if let Some(bot) = raw.bot {
            self.bot = bot;
        }
    }
}

impl Entity for User {
    type Key = Snowflake;
    const NAME: &'static str = "user";

    fn key(&self) -> Snowflake {
        self.id
    }

    fn patch(&mut self, raw: &Value) -> Result<(), PayloadError> {
        let parsed: RawUser = parse(Self::NAME, raw)?;
        self.apply(parsed);
        Ok(())
    }

    fn is_partial(&self) -> bool {
        self.partial
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_user_is_not_partial() {
        let user = User::from_raw(&json!({
            "id": "1", "username": "ferris", "discriminator": "0001", "avatar": null
        }))
        .unwrap();
        assert!(!user.partial);
        assert_eq!(user.tag().as_deref(), Some("ferris#0001"));
        assert!(user.avatar.is_none());
    }

    #[test]
    fn patch_fills_partial() {
        let mut user = User::partial(Snowflake(5));
        assert!(user.is_partial());
        user.patch(&json!({"username": "crab"})).unwrap();
        assert!(!user.is_partial());
        assert_eq!(user.username.as_deref(), Some("crab"));
    }

    #[test]
    fn patch_clears_avatar_on_null() {
        let mut user = User::from_raw(&json!({"id": "1", "username": "a", "avatar": "abc"})).unwrap();
        user.patch(&json!({"avatar": null})).unwrap();
        assert!(user.avatar.is_none());
    }

    #[test]
    fn missing_id_is_rejected() {
        let err = User::from_raw(&json!({"username": "nobody"})).unwrap_err();
        assert!(matches!(err, PayloadError::MissingField { field: "id", .. }));
    }
}

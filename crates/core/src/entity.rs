//! Entity trait: the shape every cacheable object shares.
//!
//! Entities are built from raw gateway payloads (`serde_json::Value`) and
//! later patched in place when a newer payload for the same id arrives.
//! Equality is structural: two snapshots are equal when every observable
//! field is equal.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::PayloadError;

/// A cacheable domain object.
pub trait Entity: Clone + PartialEq + Debug + Send + Sync + 'static {
    /// The key this entity is stored under.
    type Key: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    /// Name used in diagnostics (e.g. "emoji").
    const NAME: &'static str;

    fn key(&self) -> Self::Key;

    /// Apply every field present in `raw`; absent fields keep their value.
    fn patch(&mut self, raw: &Value) -> Result<(), PayloadError>;

    /// Whether this is a stub awaiting a full fetch.
    fn is_partial(&self) -> bool {
        false
    }
}

/// Entity kinds that may be materialized as partial stubs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartialKind {
    User,
    Channel,
    Message,
    Reaction,
}

impl PartialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Channel => "CHANNEL",
            Self::Message => "MESSAGE",
            Self::Reaction => "REACTION",
        }
    }
}

impl std::fmt::Display for PartialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PartialKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USER" => Ok(Self::User),
            "CHANNEL" => Ok(Self::Channel),
            "MESSAGE" => Ok(Self::Message),
            "REACTION" => Ok(Self::Reaction),
            other => Err(format!("unknown partial kind: {other}")),
        }
    }
}

/// Deserialize a typed view of `raw`, tagging failures with the entity name.
pub fn parse<'a, R: Deserialize<'a>>(entity: &'static str, raw: &'a Value) -> Result<R, PayloadError> {
    R::deserialize(raw).map_err(|e| PayloadError::Invalid {
        entity,
        reason: e.to_string(),
    })
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
///
/// Use with `#[serde(default, deserialize_with = "nullable")]`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub fn require<T>(entity: &'static str, field: &'static str, value: Option<T>) -> Result<T, PayloadError> {
    value.ok_or(PayloadError::MissingField { entity, field })
}

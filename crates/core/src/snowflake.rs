//! Snowflake identifiers.
//!
//! The platform sends ids as decimal strings; some fixtures and older
//! payloads use plain integers, so both are accepted on the way in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Milliseconds between the Unix epoch and the first second of 2015.
pub const DISCORD_EPOCH: u64 = 1_420_070_400_000;

/// A time-ordered 64-bit entity identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "SnowflakeRepr", into = "String")]
pub struct Snowflake(pub u64);

#[derive(Deserialize)]
#[serde(untagged)]
enum SnowflakeRepr {
    Text(String),
    Number(u64),
}

impl TryFrom<SnowflakeRepr> for Snowflake {
    type Error = String;

    fn try_from(repr: SnowflakeRepr) -> Result<Self, Self::Error> {
        match repr {
            SnowflakeRepr::Number(n) => Ok(Self(n)),
            SnowflakeRepr::Text(s) => s.parse(),
        }
    }
}

impl From<Snowflake> for String {
    fn from(id: Snowflake) -> Self {
        id.0.to_string()
    }
}

impl From<u64> for Snowflake {
    fn from(n: u64) -> Self {
        Self(n)
    }
}

impl FromStr for Snowflake {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|e| format!("invalid snowflake {s:?}: {e}"))
    }
}

impl std::fmt::Display for Snowflake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Snowflake {
    /// Build the smallest snowflake minted at `ms` (Unix milliseconds).
    pub fn from_timestamp_ms(ms: u64) -> Self {
        Self(ms.saturating_sub(DISCORD_EPOCH) << 22)
    }

    /// Unix milliseconds at which this id was minted.
    pub fn timestamp_ms(&self) -> u64 {
        (self.0 >> 22) + DISCORD_EPOCH
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp_ms() as i64).unwrap_or_default()
    }
}

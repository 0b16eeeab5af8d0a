//! Why a collector ended.

use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EndReason {
    /// `stop()` without a reason
    User,
    Time,
    Idle,
    Limit,
    ProcessedLimit,
    EmojiLimit,
    UserLimit,
    MessageDelete,
    ChannelDelete,
    GuildDelete,
    /// The notification bus went away
    SourceClosed,
    Custom(String),
}

impl EndReason {
    pub fn as_str(&self) -> &str {
        match self {
            Self::User => "user",
            Self::Time => "time",
            Self::Idle => "idle",
            Self::Limit => "limit",
            Self::ProcessedLimit => "processedLimit",
            Self::EmojiLimit => "emojiLimit",
            Self::UserLimit => "userLimit",
            Self::MessageDelete => "messageDelete",
            Self::ChannelDelete => "channelDelete",
            Self::GuildDelete => "guildDelete",
            Self::SourceClosed => "sourceClosed",
            Self::Custom(reason) => reason,
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for EndReason {
    fn from(reason: &str) -> Self {
        match reason {
            "user" => Self::User,
            "time" => Self::Time,
            "idle" => Self::Idle,
            "limit" => Self::Limit,
            "processedLimit" => Self::ProcessedLimit,
            "emojiLimit" => Self::EmojiLimit,
            "userLimit" => Self::UserLimit,
            "messageDelete" => Self::MessageDelete,
            "channelDelete" => Self::ChannelDelete,
            "guildDelete" => Self::GuildDelete,
            "sourceClosed" => Self::SourceClosed,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl Serialize for EndReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names_parse_back() {
        for reason in [EndReason::User, EndReason::ProcessedLimit, EndReason::GuildDelete] {
            assert_eq!(EndReason::from(reason.as_str()), reason);
        }
        assert_eq!(EndReason::from("done"), EndReason::Custom("done".into()));
    }

    #[test]
    fn serializes_as_plain_string() {
        assert_eq!(serde_json::to_string(&EndReason::EmojiLimit).unwrap(), "\"emojiLimit\"");
    }
}

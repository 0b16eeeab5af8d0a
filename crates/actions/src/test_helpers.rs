//! Shared fixtures for action tests.

use cordsync_core::{CacheOptions, Channel, ClientCache, Emoji, Guild, Message, Notification, Snowflake, User};
use serde_json::{Value, json};

use crate::registry::ActionDispatcher;

pub const BOT_ID: Snowflake = Snowflake(99);
pub const GUILD_ID: Snowflake = Snowflake(1);
pub const CHANNEL_ID: Snowflake = Snowflake(20);
pub const MESSAGE_ID: Snowflake = Snowflake(30);

/// A cache holding the bot user, guild 1 with emojis 10 and 11, text
/// channel 20 in that guild and message 30 in that channel.
pub fn seeded_cache() -> ClientCache {
    let mut cache = ClientCache::new();
    let bot = User::from_raw(&json!({"id": BOT_ID, "username": "bot", "bot": true})).unwrap();
    cache.users.insert(bot.clone());
    cache.current_user = Some(bot);

    let mut guild = Guild::from_raw(&json!({"id": GUILD_ID, "name": "Rust"})).unwrap();
    for raw in [json!({"id": "10", "name": "a"}), json!({"id": "11", "name": "b"})] {
        guild.emojis.insert(Emoji::from_raw(GUILD_ID, &raw).unwrap());
    }
    cache.guilds.insert(guild);

    let mut channel = Channel::from_raw(&json!({"id": CHANNEL_ID, "type": 0, "name": "general"}), Some(GUILD_ID), Some(200))
        .unwrap();
    channel.messages.insert(Message::from_raw(&message_payload(MESSAGE_ID, "hello"), CHANNEL_ID, Some(GUILD_ID)).unwrap());
    cache.insert_channel(channel);
    cache
}

pub fn message_payload(id: Snowflake, content: &str) -> Value {
    json!({
        "id": id,
        "channel_id": CHANNEL_ID,
        "guild_id": GUILD_ID,
        "author": {"id": "2", "username": "ferris", "discriminator": "0001"},
        "content": content,
        "edited_timestamp": null,
    })
}

pub fn dispatch(cache: &mut ClientCache, options: &CacheOptions, event: &str, payload: Value) -> Vec<Notification> {
    ActionDispatcher::new().dispatch_raw(event, &payload, cache, options)
}

/// Drop debug and warn notifications.
pub fn state_changes(notifications: &[Notification]) -> Vec<Notification> {
    notifications.iter().filter(|n| !n.is_diagnostic()).cloned().collect()
}

//! Channel create, update and delete.

use cordsync_core::{Channel, Entity, Notification, PayloadError};
use serde_json::Value;

use crate::action::{Action, ActionContext, optional_snowflake, snowflake};
use crate::gateway::GatewayEvent;

pub struct ChannelCreateAction;

impl Action for ChannelCreateAction {
    fn event(&self) -> GatewayEvent {
        GatewayEvent::ChannelCreate
    }

    fn handle(&self, payload: &Value, cx: &mut ActionContext<'_>) -> Result<(), PayloadError> {
        let id = snowflake(payload, Channel::NAME, "id")?;
        if let Some(existing) = cx.cache.channels.get_mut(&id) {
            existing.patch(payload)?;
            existing.partial = false;
            cx.debug(format!("Channel {id} already cached"));
            return Ok(());
        }

        let guild_id = optional_snowflake(payload, Channel::NAME, "guild_id")?;
        let channel = Channel::from_raw(payload, guild_id, cx.options.message_cache_max_size)?;
        cx.cache.insert_channel(channel.clone());
        cx.emit(Notification::ChannelCreate { channel });
        Ok(())
    }
}

pub struct ChannelUpdateAction;

impl Action for ChannelUpdateAction {
    fn event(&self) -> GatewayEvent {
        GatewayEvent::ChannelUpdate
    }

    fn handle(&self, payload: &Value, cx: &mut ActionContext<'_>) -> Result<(), PayloadError> {
        let id = snowflake(payload, Channel::NAME, "id")?;
        let Some(channel) = cx.cache.channels.get_mut(&id) else {
            cx.debug(format!("Update for uncached channel {id}"));
            return Ok(());
        };
        let old = channel.clone();
        channel.patch(payload)?;
        channel.partial = false;
        let new = channel.clone();
        cx.emit(Notification::ChannelUpdate { old, new });
        Ok(())
    }
}

/// `CHANNEL_DELETE`: evicts the channel. Its cached messages go with it and
/// are flagged deleted in the emitted snapshot.
pub struct ChannelDeleteAction;

impl Action for ChannelDeleteAction {
    fn event(&self) -> GatewayEvent {
        GatewayEvent::ChannelDelete
    }

    fn handle(&self, payload: &Value, cx: &mut ActionContext<'_>) -> Result<(), PayloadError> {
        let id = snowflake(payload, Channel::NAME, "id")?;
        let Some(mut channel) = cx.cache.remove_channel(id) else {
            cx.debug(format!("Delete for uncached channel {id}"));
            return Ok(());
        };
        channel.deleted = true;
        for message in channel.messages.values_mut() {
            message.deleted = true;
        }
        cx.emit(Notification::ChannelDelete { channel });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{CHANNEL_ID, GUILD_ID, MESSAGE_ID, dispatch, seeded_cache, state_changes};
    use cordsync_core::{CacheOptions, Snowflake};
    use serde_json::json;

    #[test]
    fn create_indexes_under_guild() {
        let mut cache = seeded_cache();
        let notifications = dispatch(
            &mut cache,
            &CacheOptions::default(),
            "CHANNEL_CREATE",
            json!({"id": "22", "type": 0, "guild_id": "1", "name": "off-topic"}),
        );
        assert!(matches!(notifications.as_slice(), [Notification::ChannelCreate { .. }]));
        assert!(cache.guilds.get(&GUILD_ID).unwrap().channels.contains(&Snowflake(22)));
    }

    #[test]
    fn duplicate_create_is_silent() {
        let mut cache = seeded_cache();
        let notifications =
            dispatch(&mut cache, &CacheOptions::default(), "CHANNEL_CREATE", json!({"id": "20", "name": "renamed"}));
        assert!(state_changes(&notifications).is_empty());
        assert_eq!(cache.channels.get(&CHANNEL_ID).unwrap().name.as_deref(), Some("renamed"));
    }

    #[test]
    fn update_reports_old_and_new() {
        let mut cache = seeded_cache();
        let notifications = dispatch(
            &mut cache,
            &CacheOptions::default(),
            "CHANNEL_UPDATE",
            json!({"id": "20", "topic": "rust things"}),
        );
        match notifications.as_slice() {
            [Notification::ChannelUpdate { old, new }] => {
                assert_eq!(old.topic, None);
                assert_eq!(new.topic.as_deref(), Some("rust things"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn delete_flags_channel_and_messages() {
        let mut cache = seeded_cache();
        let notifications = dispatch(&mut cache, &CacheOptions::default(), "CHANNEL_DELETE", json!({"id": "20"}));
        match notifications.as_slice() {
            [Notification::ChannelDelete { channel }] => {
                assert!(channel.deleted);
                assert!(channel.messages.get(&MESSAGE_ID).unwrap().deleted);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!cache.channels.contains(&CHANNEL_ID));
        assert!(cache.guilds.get(&GUILD_ID).unwrap().channels.is_empty());
    }
}

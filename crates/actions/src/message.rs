//! Message create, update and deletion.

use cordsync_core::{CacheOptions, Channel, Entity, Message, Notification, PayloadError, Snowflake, User};
use serde_json::Value;

use crate::action::{Action, ActionContext, optional_snowflake, snowflake};
use crate::gateway::GatewayEvent;
use crate::resolver::{get_channel, get_message};

/// `MESSAGE_CREATE`: caches the message in its channel, when the channel is
/// cached, and records its author.
pub struct MessageCreateAction;

impl Action for MessageCreateAction {
    fn event(&self) -> GatewayEvent {
        GatewayEvent::MessageCreate
    }

    fn handle(&self, payload: &Value, cx: &mut ActionContext<'_>) -> Result<(), PayloadError> {
        let channel_id = snowflake(payload, Message::NAME, "channel_id")?;
        let Some(channel) = cx.cache.channels.get_mut(&channel_id) else {
            cx.debug(format!("Message for uncached channel {channel_id}"));
            return Ok(());
        };
        let message = Message::from_raw(payload, channel_id, channel.guild_id)?;
        if channel.messages.contains(&message.id) {
            let id = message.id;
            cx.debug(format!("Message {id} already cached"));
            return Ok(());
        }
        channel.last_message_id = Some(message.id);
        channel.messages.insert(message.clone());

        if let Some(raw_author) = payload.get("author") {
            match User::from_raw(raw_author) {
                Ok(author) => match cx.cache.users.get_mut(&author.id) {
                    Some(cached) => cached.patch(raw_author)?,
                    None => {
                        cx.cache.users.insert(author);
                    }
                },
                Err(e) => cx.warn(format!("Skipping author of message {}: {e}", message.id)),
            }
        }

        cx.emit(Notification::MessageCreate { message });
        Ok(())
    }
}

/// `MESSAGE_UPDATE`: patches the message, materializing a partial one when
/// allowed. Edits to messages the cache knows nothing about are dropped.
pub struct MessageUpdateAction;

impl Action for MessageUpdateAction {
    fn event(&self) -> GatewayEvent {
        GatewayEvent::MessageUpdate
    }

    fn handle(&self, payload: &Value, cx: &mut ActionContext<'_>) -> Result<(), PayloadError> {
        let id = snowflake(payload, Message::NAME, "id")?;
        let channel_id = snowflake(payload, Message::NAME, "channel_id")?;
        let guild_id = optional_snowflake(payload, Message::NAME, "guild_id")?;

        let Some(channel) = get_channel(cx.cache, cx.options, channel_id, guild_id) else {
            cx.debug(format!("Message update for uncached channel {channel_id}"));
            return Ok(());
        };
        let Some(mut message) = get_message(channel, cx.options, id, None, true)? else {
            cx.debug(format!("Update for uncached message {id}"));
            return Ok(());
        };
        let old = message.clone();
        message.patch(payload)?;
        let new = message.into_owned();
        cx.emit(Notification::MessageUpdate { old, new });
        Ok(())
    }
}

/// Take `id` out of `channel`'s store (or its stub) as a deleted snapshot.
fn take_deleted(
    channel: &mut Channel,
    options: &CacheOptions,
    id: Snowflake,
) -> Result<Option<Message>, PayloadError> {
    let Some(resolved) = get_message(channel, options, id, None, false)? else {
        return Ok(None);
    };
    let mut message = resolved.into_owned();
    channel.messages.remove(&id);
    message.deleted = true;
    Ok(Some(message))
}

pub struct MessageDeleteAction;

impl Action for MessageDeleteAction {
    fn event(&self) -> GatewayEvent {
        GatewayEvent::MessageDelete
    }

    fn handle(&self, payload: &Value, cx: &mut ActionContext<'_>) -> Result<(), PayloadError> {
        let id = snowflake(payload, Message::NAME, "id")?;
        let channel_id = snowflake(payload, Message::NAME, "channel_id")?;
        let guild_id = optional_snowflake(payload, Message::NAME, "guild_id")?;

        let Some(channel) = get_channel(cx.cache, cx.options, channel_id, guild_id) else {
            cx.debug(format!("Delete in uncached channel {channel_id}"));
            return Ok(());
        };
        match take_deleted(channel, cx.options, id)? {
            Some(message) => cx.emit(Notification::MessageDelete { message }),
            None => cx.debug(format!("Delete for uncached message {id}")),
        }
        Ok(())
    }
}

/// `MESSAGE_DELETE_BULK`: one notification for every message that could be
/// resolved.
pub struct MessageDeleteBulkAction;

impl Action for MessageDeleteBulkAction {
    fn event(&self) -> GatewayEvent {
        GatewayEvent::MessageDeleteBulk
    }

    fn handle(&self, payload: &Value, cx: &mut ActionContext<'_>) -> Result<(), PayloadError> {
        let channel_id = snowflake(payload, "message_delete_bulk", "channel_id")?;
        let ids = payload
            .get("ids")
            .and_then(Value::as_array)
            .ok_or(PayloadError::MissingField {
                entity: "message_delete_bulk",
                field: "ids",
            })?;

        let Some(channel) = cx.cache.channels.get_mut(&channel_id) else {
            cx.debug(format!("Bulk delete in uncached channel {channel_id}"));
            return Ok(());
        };

        let mut messages = Vec::new();
        let mut problems = Vec::new();
        for raw_id in ids {
            let id = match serde::Deserialize::deserialize(raw_id) {
                Ok(id) => id,
                Err(e) => {
                    problems.push(format!("Skipping message id {raw_id} in bulk delete: {e}"));
                    continue;
                }
            };
            if let Some(message) = take_deleted(channel, cx.options, id)? {
                messages.push(message);
            }
        }

        for problem in problems {
            cx.warn(problem);
        }
        if !messages.is_empty() {
            cx.emit(Notification::MessageDeleteBulk { channel_id, messages });
        }
        Ok(())
    }
}

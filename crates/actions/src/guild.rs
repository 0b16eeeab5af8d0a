//! Guild lifecycle: create, update, delete and outages.

use cordsync_core::{Channel, Emoji, Entity, Guild, Notification, PayloadError, Snowflake};
use serde_json::Value;

use crate::action::{Action, ActionContext, snowflake};
use crate::emoji::sync_emojis;
use crate::gateway::GatewayEvent;

fn array<'a>(payload: &'a Value, field: &str) -> &'a [Value] {
    payload.get(field).and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default()
}

/// `GUILD_CREATE`: a guild became available, either for the first time or
/// after an outage. Channels and emojis in the payload are cached with it.
pub struct GuildCreateAction;

impl Action for GuildCreateAction {
    fn event(&self) -> GatewayEvent {
        GatewayEvent::GuildCreate
    }

    fn handle(&self, payload: &Value, cx: &mut ActionContext<'_>) -> Result<(), PayloadError> {
        let id = snowflake(payload, Guild::NAME, "id")?;
        let was_available = cx.cache.guilds.get(&id).map(Guild::available);
        let mut problems = Vec::new();
        let mut emoji_notifications = Vec::new();

        match cx.cache.guilds.get_mut(&id) {
            Some(guild) => {
                guild.patch(payload)?;
                guild.unavailable = payload.get("unavailable").and_then(Value::as_bool).unwrap_or(false);
                if payload.get("emojis").is_some() {
                    let (notifications, skipped) = sync_emojis(guild, array(payload, "emojis"));
                    if was_available == Some(true) {
                        emoji_notifications = notifications;
                    }
                    problems.extend(skipped);
                }
            }
            None => {
                let mut guild = Guild::from_raw(payload)?;
                for raw in array(payload, "emojis") {
                    match Emoji::from_raw(id, raw) {
                        Ok(emoji) => {
                            guild.emojis.insert(emoji);
                        }
                        Err(e) => problems.push(format!("Skipping emoji in guild {id}: {e}")),
                    }
                }
                cx.cache.guilds.insert(guild);
            }
        }

        for raw in array(payload, "channels") {
            if let Err(e) = upsert_channel(cx, raw, id) {
                problems.push(format!("Skipping channel in guild {id}: {e}"));
            }
        }

        for problem in problems {
            cx.warn(problem);
        }
        for notification in emoji_notifications {
            cx.emit(notification);
        }

        if was_available == Some(true) {
            cx.debug(format!("Guild {id} was already available"));
            return Ok(());
        }
        if let Some(guild) = cx.cache.guilds.get(&id) {
            let guild = guild.clone();
            tracing::info!(guild = %id, channels = guild.channels.len(), "Guild available");
            cx.emit(Notification::GuildCreate { guild });
        }
        Ok(())
    }
}

fn upsert_channel(cx: &mut ActionContext<'_>, raw: &Value, guild_id: Snowflake) -> Result<(), PayloadError> {
    let channel_id = snowflake(raw, Channel::NAME, "id")?;
    match cx.cache.channels.get_mut(&channel_id) {
        Some(channel) => {
            channel.patch(raw)?;
            channel.partial = false;
        }
        None => {
            let channel = Channel::from_raw(raw, Some(guild_id), cx.options.message_cache_max_size)?;
            cx.cache.insert_channel(channel);
        }
    }
    if let Some(guild) = cx.cache.guilds.get_mut(&guild_id) {
        guild.channels.insert(channel_id);
    }
    Ok(())
}

/// `GUILD_UPDATE`: patches a cached guild. An included emoji list is
/// synchronized first.
pub struct GuildUpdateAction;

impl Action for GuildUpdateAction {
    fn event(&self) -> GatewayEvent {
        GatewayEvent::GuildUpdate
    }

    fn handle(&self, payload: &Value, cx: &mut ActionContext<'_>) -> Result<(), PayloadError> {
        let id = snowflake(payload, Guild::NAME, "id")?;
        let Some(guild) = cx.cache.guilds.get_mut(&id) else {
            cx.debug(format!("Update for uncached guild {id}"));
            return Ok(());
        };

        let old = guild.clone();
        guild.patch(payload)?;
        let (emoji_notifications, problems) = match payload.get("emojis").and_then(Value::as_array) {
            Some(emojis) => sync_emojis(guild, emojis),
            None => Default::default(),
        };
        let new = guild.clone();

        for problem in problems {
            cx.warn(problem);
        }
        for notification in emoji_notifications {
            cx.emit(notification);
        }
        cx.emit(Notification::GuildUpdate { old, new });
        Ok(())
    }
}

/// `GUILD_DELETE`: with `unavailable` the guild went through an outage and
/// stays cached; otherwise the client left it and it is evicted together
/// with its channels.
pub struct GuildDeleteAction;

impl Action for GuildDeleteAction {
    fn event(&self) -> GatewayEvent {
        GatewayEvent::GuildDelete
    }

    fn handle(&self, payload: &Value, cx: &mut ActionContext<'_>) -> Result<(), PayloadError> {
        let id = snowflake(payload, Guild::NAME, "id")?;
        let outage = payload.get("unavailable").and_then(Value::as_bool).unwrap_or(false);

        if outage {
            let Some(guild) = cx.cache.guilds.get_mut(&id) else {
                cx.debug(format!("Outage for uncached guild {id}"));
                return Ok(());
            };
            if guild.unavailable {
                return Ok(());
            }
            guild.unavailable = true;
            let guild = guild.clone();
            tracing::warn!(guild = %id, "Guild unavailable");
            cx.emit(Notification::GuildUnavailable { guild });
            return Ok(());
        }

        let Some(guild) = cx.cache.guilds.remove(&id) else {
            cx.debug(format!("Delete for uncached guild {id}"));
            return Ok(());
        };
        for channel_id in &guild.channels {
            cx.cache.remove_channel(*channel_id);
        }
        cx.emit(Notification::GuildDelete { guild });
        Ok(())
    }
}

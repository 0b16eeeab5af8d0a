//! Reaction add and removal.
//!
//! Reactions live on messages, so every event first resolves its channel
//! and message. Voice channels never carry messages and are ignored.

use cordsync_core::{
    CacheOptions, Entity, Message, Notification, PartialKind, PayloadError, Reaction, ReactionEmoji, Snowflake,
};
use serde::Deserialize;
use serde_json::Value;

use crate::action::{Action, ActionContext, optional_snowflake, snowflake};
use crate::gateway::GatewayEvent;
use crate::resolver::{ResolveOptions, get_channel, get_message, get_reaction, get_user_from_member, resolve_or_create};

/// Ids shared by every reaction payload.
struct Target {
    channel_id: Snowflake,
    message_id: Snowflake,
    guild_id: Option<Snowflake>,
}

impl Target {
    fn parse(payload: &Value) -> Result<Self, PayloadError> {
        Ok(Self {
            channel_id: snowflake(payload, Reaction::NAME, "channel_id")?,
            message_id: snowflake(payload, Reaction::NAME, "message_id")?,
            guild_id: optional_snowflake(payload, Reaction::NAME, "guild_id")?,
        })
    }
}

fn parse_emoji(payload: &Value) -> Result<ReactionEmoji, PayloadError> {
    let raw = payload.get("emoji").ok_or(PayloadError::MissingField {
        entity: Reaction::NAME,
        field: "emoji",
    })?;
    let emoji = ReactionEmoji::deserialize(raw).map_err(|e| PayloadError::Invalid {
        entity: Reaction::NAME,
        reason: format!("emoji: {e}"),
    })?;
    if emoji.id.is_none() && emoji.name.is_none() {
        return Err(PayloadError::MissingField {
            entity: Reaction::NAME,
            field: "emoji.name",
        });
    }
    Ok(emoji)
}

/// Run `f` on the target message, if it can be resolved.
fn on_message<R>(
    cx: &mut ActionContext<'_>,
    target: &Target,
    f: impl FnOnce(&mut Message, &CacheOptions) -> Result<Option<R>, PayloadError>,
) -> Result<Option<R>, PayloadError> {
    let options = cx.options;
    let Some(channel) = get_channel(cx.cache, options, target.channel_id, target.guild_id) else {
        return Ok(None);
    };
    if !channel.kind.is_text_based() {
        return Ok(None);
    }
    let Some(mut message) = get_message(channel, options, target.message_id, None, true)? else {
        return Ok(None);
    };
    f(&mut *message, options)
}

pub struct ReactionAddAction;

impl Action for ReactionAddAction {
    fn event(&self) -> GatewayEvent {
        GatewayEvent::MessageReactionAdd
    }

    fn handle(&self, payload: &Value, cx: &mut ActionContext<'_>) -> Result<(), PayloadError> {
        let target = Target::parse(payload)?;
        let emoji = parse_emoji(payload)?;
        let user_id = snowflake(payload, Reaction::NAME, "user_id")?;
        let current_user = cx.cache.current_user_id();

        let Some(user) = get_user_from_member(cx.cache, cx.options, user_id, payload)? else {
            cx.debug(format!("Reaction by uncached user {user_id}"));
            return Ok(());
        };

        let added = on_message(cx, &target, |message, options| {
            if message.partial && !options.allows(PartialKind::Reaction) {
                return Ok(None);
            }
            let key = emoji.identifier();
            if message.reactions.get(&key).is_some_and(|r| r.users.contains(&user_id)) {
                return Ok(None);
            }
            let (message_id, partial) = (message.id, message.partial);
            let Some(mut reaction) = resolve_or_create(
                &mut message.reactions,
                &key,
                None,
                ResolveOptions {
                    partial_allowed: true,
                    cache: true,
                },
                move || match partial {
                    true => Reaction::partial(message_id, emoji),
                    false => Reaction::new(message_id, emoji),
                },
            )?
            else {
                return Ok(None);
            };
            reaction.add_user(user_id, current_user);
            Ok(Some(reaction.into_owned()))
        })?;

        match added {
            Some(reaction) => cx.emit(Notification::ReactionAdd { reaction, user }),
            None => cx.debug(format!("Ignored reaction add on message {}", target.message_id)),
        }
        Ok(())
    }
}

pub struct ReactionRemoveAction;

impl Action for ReactionRemoveAction {
    fn event(&self) -> GatewayEvent {
        GatewayEvent::MessageReactionRemove
    }

    fn handle(&self, payload: &Value, cx: &mut ActionContext<'_>) -> Result<(), PayloadError> {
        let target = Target::parse(payload)?;
        let emoji = parse_emoji(payload)?;
        let user_id = snowflake(payload, Reaction::NAME, "user_id")?;
        let current_user = cx.cache.current_user_id();

        let Some(user) = get_user_from_member(cx.cache, cx.options, user_id, payload)? else {
            cx.debug(format!("Reaction removal by uncached user {user_id}"));
            return Ok(());
        };

        let removed = on_message(cx, &target, |message, options| {
            let Some(mut reaction) = get_reaction(message, options, &emoji, None)? else {
                return Ok(None);
            };
            reaction.remove_user(user_id, current_user);
            let reaction = reaction.into_owned();
            if !reaction.partial && reaction.is_empty() {
                message.reactions.remove(&reaction.key());
            }
            Ok(Some(reaction))
        })?;

        match removed {
            Some(reaction) => cx.emit(Notification::ReactionRemove { reaction, user }),
            None => cx.debug(format!("Ignored reaction removal on message {}", target.message_id)),
        }
        Ok(())
    }
}

pub struct ReactionRemoveAllAction;

impl Action for ReactionRemoveAllAction {
    fn event(&self) -> GatewayEvent {
        GatewayEvent::MessageReactionRemoveAll
    }

    fn handle(&self, payload: &Value, cx: &mut ActionContext<'_>) -> Result<(), PayloadError> {
        let target = Target::parse(payload)?;
        let cleared = on_message(cx, &target, |message, _| {
            message.reactions.clear();
            Ok(Some(message.clone()))
        })?;

        match cleared {
            Some(message) => cx.emit(Notification::ReactionRemoveAll { message }),
            None => cx.debug(format!("Ignored reaction purge on message {}", target.message_id)),
        }
        Ok(())
    }
}

pub struct ReactionRemoveEmojiAction;

impl Action for ReactionRemoveEmojiAction {
    fn event(&self) -> GatewayEvent {
        GatewayEvent::MessageReactionRemoveEmoji
    }

    fn handle(&self, payload: &Value, cx: &mut ActionContext<'_>) -> Result<(), PayloadError> {
        let target = Target::parse(payload)?;
        let emoji = parse_emoji(payload)?;
        let removed = on_message(cx, &target, |message, options| {
            let partial = message.partial;
            let Some(reaction) = get_reaction(message, options, &emoji, None)? else {
                return Ok(None);
            };
            let reaction = reaction.into_owned();
            if !partial {
                message.reactions.remove(&reaction.key());
            }
            Ok(Some(reaction))
        })?;

        match removed {
            Some(reaction) => cx.emit(Notification::ReactionRemoveEmoji { reaction }),
            None => cx.debug(format!("Ignored emoji purge on message {}", target.message_id)),
        }
        Ok(())
    }
}

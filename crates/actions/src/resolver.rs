//! Partial-entity resolution.
//!
//! Events often reference entities the cache has never seen. The resolver
//! decides per entity kind whether to return the cached entity, create a
//! stub flagged `partial`, or give up. Stubs are only created for kinds
//! listed in [`CacheOptions::partials`].

use std::ops::{Deref, DerefMut};

use cordsync_core::{
    CacheOptions, CacheStore, Channel, ClientCache, Entity, Message, PartialKind, PayloadError, Reaction,
    ReactionEmoji, Snowflake, User,
};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Whether a stub may be created when the entity is not cached.
    pub partial_allowed: bool,
    /// Whether a created stub is stored, and whether a cached entity is
    /// patched with the event's data.
    pub cache: bool,
}

/// An entity living in its store, or one that could not be stored.
#[derive(Debug)]
pub enum Resolved<'a, T> {
    Cached(&'a mut T),
    Detached(T),
}

impl<T: Clone> Resolved<'_, T> {
    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cached(_))
    }

    /// Take a snapshot, releasing the borrow on the store.
    pub fn into_owned(self) -> T {
        match self {
            Self::Cached(entity) => entity.clone(),
            Self::Detached(entity) => entity,
        }
    }
}

impl<T> Deref for Resolved<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self {
            Self::Cached(entity) => entity,
            Self::Detached(entity) => entity,
        }
    }
}

impl<T> DerefMut for Resolved<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match self {
            Self::Cached(entity) => entity,
            Self::Detached(entity) => entity,
        }
    }
}

/// Look `key` up in `store`, creating a stub with `stub` when allowed.
///
/// A cached entity is patched with `raw` when `options.cache` is set. A
/// failed patch leaves it untouched and is returned as an error.
pub fn resolve_or_create<'a, T: Entity>(
    store: &'a mut CacheStore<T>,
    key: &T::Key,
    raw: Option<&Value>,
    options: ResolveOptions,
    stub: impl FnOnce() -> T,
) -> Result<Option<Resolved<'a, T>>, PayloadError> {
    if store.contains(key) {
        if let (true, Some(raw), Some(existing)) = (options.cache, raw, store.get_mut(key)) {
            existing.patch(raw)?;
        }
        return Ok(store.get_mut(key).map(Resolved::Cached));
    }

    if !options.partial_allowed {
        return Ok(None);
    }

    let entity = stub();
    if options.cache && store.accepts_inserts() {
        store.insert(entity);
        return Ok(store.get_mut(key).map(Resolved::Cached));
    }
    Ok(Some(Resolved::Detached(entity)))
}

/// Resolve a user, patching a cached one with `raw` when given.
pub fn get_user(
    cache: &mut ClientCache,
    options: &CacheOptions,
    user_id: Snowflake,
    raw: Option<&Value>,
) -> Result<Option<User>, PayloadError> {
    let resolved = resolve_or_create(
        &mut cache.users,
        &user_id,
        raw,
        ResolveOptions {
            partial_allowed: options.allows(PartialKind::User),
            cache: true,
        },
        || User::partial(user_id),
    )?;
    Ok(resolved.map(Resolved::into_owned))
}

/// Resolve the user behind an event that may embed a guild member.
///
/// A full `member.user` object creates or refreshes the cached user; without
/// one this is [`get_user`].
pub fn get_user_from_member(
    cache: &mut ClientCache,
    options: &CacheOptions,
    user_id: Snowflake,
    payload: &Value,
) -> Result<Option<User>, PayloadError> {
    let Some(raw) = payload.get("member").and_then(|member| member.get("user")) else {
        return get_user(cache, options, user_id, None);
    };
    if let Some(cached) = cache.users.get_mut(&user_id) {
        cached.patch(raw)?;
        return Ok(Some(cached.clone()));
    }
    let user = User::from_raw(raw)?;
    cache.users.insert(user.clone());
    Ok(Some(user))
}

/// Resolve a channel. Stubs are always cached and indexed under their guild.
pub fn get_channel<'a>(
    cache: &'a mut ClientCache,
    options: &CacheOptions,
    channel_id: Snowflake,
    guild_id: Option<Snowflake>,
) -> Option<&'a mut Channel> {
    if !cache.channels.contains(&channel_id) {
        if !options.allows(PartialKind::Channel) {
            return None;
        }
        tracing::debug!(channel = %channel_id, "Creating partial channel");
        cache.insert_channel(Channel::partial(channel_id, guild_id, options.message_cache_max_size));
    }
    cache.channels.get_mut(&channel_id)
}

/// Resolve a message in `channel`.
///
/// Falls back to building a detached message from `raw` when the message is
/// neither cached nor allowed as a stub.
pub fn get_message<'a>(
    channel: &'a mut Channel,
    options: &CacheOptions,
    message_id: Snowflake,
    raw: Option<&Value>,
    cache: bool,
) -> Result<Option<Resolved<'a, Message>>, PayloadError> {
    let (channel_id, guild_id) = (channel.id, channel.guild_id);
    let resolved = resolve_or_create(
        &mut channel.messages,
        &message_id,
        raw,
        ResolveOptions {
            partial_allowed: options.allows(PartialKind::Message),
            cache,
        },
        || Message::partial(message_id, channel_id, guild_id),
    )?;
    if resolved.is_some() {
        return Ok(resolved);
    }
    match raw {
        Some(raw) => Ok(Some(Resolved::Detached(Message::from_raw(raw, channel_id, guild_id)?))),
        None => Ok(None),
    }
}

/// Resolve the reaction for `emoji` on `message`.
pub fn get_reaction<'a>(
    message: &'a mut Message,
    options: &CacheOptions,
    emoji: &ReactionEmoji,
    raw: Option<&Value>,
) -> Result<Option<Resolved<'a, Reaction>>, PayloadError> {
    let message_id = message.id;
    resolve_or_create(
        &mut message.reactions,
        &emoji.identifier(),
        raw,
        ResolveOptions {
            partial_allowed: options.allows(PartialKind::Reaction),
            cache: true,
        },
        || Reaction::partial(message_id, emoji.clone()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn channel() -> Channel {
        Channel::partial(Snowflake(20), Some(Snowflake(1)), Some(10))
    }

    #[test]
    fn partial_message_is_created_and_cached() {
        let options = CacheOptions::default().with_partials([PartialKind::Message]);
        let mut channel = channel();
        let message = get_message(&mut channel, &options, Snowflake(5), None, true).unwrap().unwrap();
        assert!(message.is_cached());
        assert_eq!(message.id, Snowflake(5));
        assert!(message.partial);
        assert!(channel.messages.contains(&Snowflake(5)));
    }

    #[test]
    fn uncached_message_without_partials_is_absent() {
        let options = CacheOptions::default();
        let mut channel = channel();
        assert!(get_message(&mut channel, &options, Snowflake(5), None, true).unwrap().is_none());
        assert!(channel.messages.is_empty());
    }

    #[test]
    fn raw_message_is_the_fallback() {
        let options = CacheOptions::default();
        let mut channel = channel();
        let raw = json!({"id": "5", "content": "hi", "author": {"id": "2"}});
        let message = get_message(&mut channel, &options, Snowflake(5), Some(&raw), true).unwrap().unwrap();
        assert!(!message.is_cached());
        assert_eq!(message.content.as_deref(), Some("hi"));
        assert!(channel.messages.is_empty());
    }

    #[test]
    fn uncached_stub_is_detached() {
        let options = CacheOptions::default().with_partials([PartialKind::Message]);
        let mut channel = channel();
        let message = get_message(&mut channel, &options, Snowflake(5), None, false).unwrap().unwrap();
        assert!(!message.is_cached());
        assert!(channel.messages.is_empty());
    }

    #[test]
    fn cached_entity_is_patched() {
        let mut cache = ClientCache::new();
        cache.users.insert(User::partial(Snowflake(3)));
        let user = get_user(&mut cache, &CacheOptions::default(), Snowflake(3), Some(&json!({"username": "ferris"})))
            .unwrap()
            .unwrap();
        assert_eq!(user.username.as_deref(), Some("ferris"));
        assert!(!cache.users.get(&Snowflake(3)).unwrap().partial);
    }

    #[test]
    fn patch_is_skipped_when_not_caching() {
        let mut store = CacheStore::new();
        store.insert(User::partial(Snowflake(3)));
        let options = ResolveOptions {
            partial_allowed: false,
            cache: false,
        };
        let user = resolve_or_create(&mut store, &Snowflake(3), Some(&json!({"username": "x"})), options, || {
            User::partial(Snowflake(3))
        })
        .unwrap()
        .unwrap();
        assert_eq!(user.username, None);
    }

    #[test]
    fn cached_entity_resolves_without_a_stub() {
        let mut store = CacheStore::new();
        store.insert(User::partial(Snowflake(3)));
        let options = ResolveOptions {
            partial_allowed: false,
            cache: true,
        };
        let user = resolve_or_create(&mut store, &Snowflake(3), None, options, || unreachable!("stub built for a cached key"))
            .unwrap()
            .unwrap();
        assert!(user.is_cached());
        assert!(user.partial);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn malformed_patch_leaves_entity_untouched() {
        let mut cache = ClientCache::new();
        cache.users.insert(User::partial(Snowflake(3)));
        let result = get_user(&mut cache, &CacheOptions::default(), Snowflake(3), Some(&json!({"username": 5})));
        assert!(result.is_err());
        assert_eq!(cache.users.get(&Snowflake(3)).unwrap(), &User::partial(Snowflake(3)));
    }

    #[test]
    fn member_payload_creates_full_user() {
        let mut cache = ClientCache::new();
        let payload = json!({"member": {"user": {"id": "3", "username": "ferris"}}});
        let user = get_user_from_member(&mut cache, &CacheOptions::default(), Snowflake(3), &payload)
            .unwrap()
            .unwrap();
        assert!(!user.partial);
        assert!(cache.users.contains(&Snowflake(3)));
        assert!(get_user_from_member(&mut cache, &CacheOptions::default(), Snowflake(4), &json!({})).unwrap().is_none());
    }

    #[test]
    fn partial_channel_is_indexed_under_guild() {
        let mut cache = ClientCache::new();
        cache.guilds.insert(cordsync_core::Guild::unavailable(Snowflake(1)));
        let options = CacheOptions::default().with_partials([PartialKind::Channel]);
        let channel = get_channel(&mut cache, &options, Snowflake(20), Some(Snowflake(1))).unwrap();
        assert!(channel.partial);
        assert!(cache.guilds.get(&Snowflake(1)).unwrap().channels.contains(&Snowflake(20)));
        assert!(get_channel(&mut cache, &CacheOptions::default(), Snowflake(21), None).is_none());
    }

    #[test]
    fn partial_reaction_on_message() {
        let options = CacheOptions::default().with_partials([PartialKind::Reaction]);
        let mut message = Message::partial(Snowflake(5), Snowflake(20), None);
        let emoji = ReactionEmoji::unicode("🦀");
        let reaction = get_reaction(&mut message, &options, &emoji, None).unwrap().unwrap();
        assert!(reaction.partial);
        assert!(message.reactions.contains(&"🦀".to_string()));
    }
}

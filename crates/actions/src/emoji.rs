//! Emoji list synchronization.
//!
//! `GUILD_EMOJIS_UPDATE` carries the full emoji list of a guild. The cached
//! store is reconciled against it: changed emojis are updated, unknown ones
//! created and cached ones missing from the list deleted.

use cordsync_core::{Emoji, Entity, Guild, Notification, PayloadError, Snowflake};
use indexmap::IndexSet;
use serde_json::Value;

use crate::action::{Action, ActionContext, snowflake};
use crate::gateway::GatewayEvent;

/// Reconcile `guild.emojis` with `emojis`, the authoritative list.
///
/// Returns the notifications in emission order (all updates, then all
/// creates, then all deletes) and a diagnostic for every entry that was
/// skipped. Emojis already cached are compared after patching; an unchanged
/// emoji produces nothing. Deletion is decided against the ids cached before
/// this call, so an emoji created here is never deleted in the same pass.
pub fn sync_emojis(guild: &mut Guild, emojis: &[Value]) -> (Vec<Notification>, Vec<String>) {
    let mut pending: IndexSet<Snowflake> = guild.emojis.keys().copied().collect();
    let mut seen = IndexSet::new();
    let mut updates = Vec::new();
    let mut creates = Vec::new();
    let mut problems = Vec::new();

    for raw in emojis {
        let id = match snowflake(raw, Emoji::NAME, "id") {
            Ok(id) => id,
            Err(e) => {
                problems.push(format!("Skipping emoji in guild {}: {e}", guild.id));
                continue;
            }
        };
        if !seen.insert(id) {
            problems.push(format!("Skipping duplicate emoji {id} in guild {}", guild.id));
            continue;
        }

        match guild.emojis.get(&id) {
            Some(cached) => {
                pending.shift_remove(&id);
                let mut patched = cached.clone();
                match patched.patch(raw) {
                    Ok(()) if patched != *cached => updates.push((cached.clone(), patched)),
                    Ok(()) => {}
                    Err(e) => problems.push(format!("Skipping emoji {id} in guild {}: {e}", guild.id)),
                }
            }
            None => match Emoji::from_raw(guild.id, raw) {
                Ok(emoji) => creates.push(emoji),
                Err(e) => problems.push(format!("Skipping emoji {id} in guild {}: {e}", guild.id)),
            },
        }
    }

    let mut notifications = Vec::with_capacity(updates.len() + creates.len() + pending.len());
    for (old, new) in updates {
        guild.emojis.insert(new.clone());
        notifications.push(Notification::EmojiUpdate { old, new });
    }
    for emoji in creates {
        guild.emojis.insert(emoji.clone());
        notifications.push(Notification::EmojiCreate { emoji });
    }
    for id in pending {
        if let Some(emoji) = guild.emojis.remove(&id) {
            notifications.push(Notification::EmojiDelete { emoji });
        }
    }

    (notifications, problems)
}

pub struct GuildEmojisUpdateAction;

impl Action for GuildEmojisUpdateAction {
    fn event(&self) -> GatewayEvent {
        GatewayEvent::GuildEmojisUpdate
    }

    fn handle(&self, payload: &Value, cx: &mut ActionContext<'_>) -> Result<(), PayloadError> {
        let guild_id = snowflake(payload, "guild_emojis_update", "guild_id")?;
        let emojis = payload
            .get("emojis")
            .and_then(Value::as_array)
            .ok_or(PayloadError::MissingField {
                entity: "guild_emojis_update",
                field: "emojis",
            })?;

        let Some(guild) = cx.cache.guilds.get_mut(&guild_id) else {
            cx.warn(format!("Emoji update for uncached guild {guild_id}"));
            return Ok(());
        };
        let (notifications, problems) = sync_emojis(guild, emojis);
        for problem in problems {
            cx.warn(problem);
        }
        for notification in notifications {
            cx.emit(notification);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{dispatch, seeded_cache, state_changes};
    use serde_json::json;

    fn guild() -> Guild {
        let mut guild = Guild::from_raw(&json!({"id": "1", "name": "Rust"})).unwrap();
        for raw in [json!({"id": "10", "name": "a"}), json!({"id": "11", "name": "b"})] {
            guild.emojis.insert(Emoji::from_raw(guild.id, &raw).unwrap());
        }
        guild
    }

    fn kinds(notifications: &[Notification]) -> Vec<String> {
        notifications
            .iter()
            .map(|n| match n {
                Notification::EmojiUpdate { new, .. } => format!("update {}", new.id),
                Notification::EmojiCreate { emoji } => format!("create {}", emoji.id),
                Notification::EmojiDelete { emoji } => format!("delete {}", emoji.id),
                other => other.name().to_string(),
            })
            .collect()
    }

    #[test]
    fn rename_create_and_delete_in_order() {
        let mut guild = guild();
        let (notifications, problems) = sync_emojis(
            &mut guild,
            &[json!({"id": "10", "name": "a2"}), json!({"id": "12", "name": "c"})],
        );
        assert!(problems.is_empty());
        assert_eq!(kinds(&notifications), vec!["update 10", "create 12", "delete 11"]);
        match &notifications[0] {
            Notification::EmojiUpdate { old, new } => {
                assert_eq!(old.name.as_deref(), Some("a"));
                assert_eq!(new.name.as_deref(), Some("a2"));
            }
            other => panic!("unexpected {other:?}"),
        }
        let ids: Vec<_> = guild.emojis.keys().copied().collect();
        assert_eq!(ids, vec![Snowflake(10), Snowflake(12)]);
    }

    #[test]
    fn replacing_one_emoji_creates_and_deletes_only() {
        let mut guild = guild();
        let (notifications, problems) = sync_emojis(
            &mut guild,
            &[json!({"id": "10", "name": "a"}), json!({"id": "12", "name": "c"})],
        );
        assert!(problems.is_empty());
        assert_eq!(kinds(&notifications), vec!["create 12", "delete 11"]);
        match &notifications[1] {
            Notification::EmojiDelete { emoji } => assert_eq!(emoji.name.as_deref(), Some("b")),
            other => panic!("unexpected {other:?}"),
        }
        let ids: Vec<_> = guild.emojis.keys().copied().collect();
        assert_eq!(ids, vec![Snowflake(10), Snowflake(12)]);
    }

    #[test]
    fn second_sync_with_same_list_is_silent() {
        let mut guild = guild();
        let list = [json!({"id": "10", "name": "a2"}), json!({"id": "12", "name": "c"})];

        let (first, _) = sync_emojis(&mut guild, &list);
        assert_eq!(first.len(), 3);
        let after_first = guild.emojis.clone();

        let (second, problems) = sync_emojis(&mut guild, &list);
        assert!(second.is_empty());
        assert!(problems.is_empty());
        assert_eq!(guild.emojis, after_first);
    }

    #[test]
    fn unchanged_list_is_silent() {
        let mut guild = guild();
        let (notifications, _) = sync_emojis(
            &mut guild,
            &[json!({"id": "10", "name": "a"}), json!({"id": "11", "name": "b"})],
        );
        assert!(notifications.is_empty());
        assert_eq!(guild.emojis.len(), 2);
    }

    #[test]
    fn empty_list_deletes_everything() {
        let mut guild = guild();
        let (notifications, _) = sync_emojis(&mut guild, &[]);
        assert_eq!(kinds(&notifications), vec!["delete 10", "delete 11"]);
        assert!(guild.emojis.is_empty());
    }

    #[test]
    fn role_change_is_an_update() {
        let mut guild = guild();
        let (notifications, _) = sync_emojis(
            &mut guild,
            &[json!({"id": "10", "name": "a", "roles": ["5"]}), json!({"id": "11", "name": "b"})],
        );
        assert_eq!(kinds(&notifications), vec!["update 10"]);
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let mut guild = guild();
        let (notifications, problems) = sync_emojis(
            &mut guild,
            &[
                json!({"id": "10", "name": "a"}),
                json!({"id": "11", "name": "b"}),
                json!({"name": "no-id"}),
                json!({"id": null, "name": "null-id"}),
                json!({"id": "13", "name": 42}),
            ],
        );
        assert!(notifications.is_empty());
        assert_eq!(problems.len(), 3);
        assert_eq!(guild.emojis.len(), 2);
    }

    #[test]
    fn duplicate_ids_create_once() {
        let mut guild = guild();
        let (notifications, problems) = sync_emojis(
            &mut guild,
            &[
                json!({"id": "10", "name": "a"}),
                json!({"id": "11", "name": "b"}),
                json!({"id": "12", "name": "c"}),
                json!({"id": "12", "name": "c"}),
            ],
        );
        assert_eq!(kinds(&notifications), vec!["create 12"]);
        assert_eq!(problems.len(), 1);
    }

    #[test]
    fn action_syncs_cached_guild() {
        let mut cache = seeded_cache();
        let notifications = dispatch(
            &mut cache,
            &Default::default(),
            "GUILD_EMOJIS_UPDATE",
            json!({"guild_id": "1", "emojis": [{"id": "10", "name": "renamed"}]}),
        );
        assert_eq!(kinds(&state_changes(&notifications)), vec!["update 10", "delete 11"]);
    }

    #[test]
    fn action_on_uncached_guild_is_a_noop() {
        let mut cache = seeded_cache();
        let notifications = dispatch(
            &mut cache,
            &Default::default(),
            "GUILD_EMOJIS_UPDATE",
            json!({"guild_id": "404", "emojis": []}),
        );
        assert_eq!(kinds(&notifications), vec!["warn"]);
        assert_eq!(cache.guilds.get(&Snowflake(1)).unwrap().emojis.len(), 2);
    }
}

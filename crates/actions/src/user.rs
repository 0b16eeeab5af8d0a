//! Session start and user updates.

use cordsync_core::{Entity, Guild, Notification, PayloadError, User};
use serde_json::Value;

use crate::action::{Action, ActionContext, snowflake};
use crate::gateway::GatewayEvent;

/// `READY`: records the current user and the guilds it is in. Guilds arrive
/// as unavailable placeholders until their `GUILD_CREATE`.
pub struct ReadyAction;

impl Action for ReadyAction {
    fn event(&self) -> GatewayEvent {
        GatewayEvent::Ready
    }

    fn handle(&self, payload: &Value, cx: &mut ActionContext<'_>) -> Result<(), PayloadError> {
        let raw_user = payload
            .get("user")
            .ok_or(PayloadError::MissingField { entity: "ready", field: "user" })?;
        let user = User::from_raw(raw_user)?;
        cx.cache.users.insert(user.clone());
        cx.cache.current_user = Some(user.clone());

        let guilds = payload.get("guilds").and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();
        for raw in guilds {
            match snowflake(raw, Guild::NAME, "id") {
                Ok(id) if !cx.cache.guilds.contains(&id) => {
                    cx.cache.guilds.insert(Guild::unavailable(id));
                }
                Ok(_) => {}
                Err(e) => cx.warn(format!("Skipping guild in READY: {e}")),
            }
        }

        tracing::info!(user = %user.id, guilds = cx.cache.guilds.len(), "Session ready");
        cx.emit(Notification::Ready { user });
        Ok(())
    }
}

/// `USER_UPDATE`: patches a cached user and reports the change, if any.
pub struct UserUpdateAction;

impl Action for UserUpdateAction {
    fn event(&self) -> GatewayEvent {
        GatewayEvent::UserUpdate
    }

    fn handle(&self, payload: &Value, cx: &mut ActionContext<'_>) -> Result<(), PayloadError> {
        let id = snowflake(payload, User::NAME, "id")?;
        let Some(user) = cx.cache.users.get_mut(&id) else {
            cx.debug(format!("Update for uncached user {id}"));
            return Ok(());
        };
        let old = user.clone();
        user.patch(payload)?;
        let new = user.clone();

        if let Some(current) = cx.cache.current_user.as_mut().filter(|u| u.id == id) {
            *current = new.clone();
        }
        if old != new {
            cx.emit(Notification::UserUpdate { old, new });
        }
        Ok(())
    }
}

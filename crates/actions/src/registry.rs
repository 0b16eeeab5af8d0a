//! Action dispatcher: routes gateway events to their action.

use std::collections::HashMap;

use cordsync_core::{CacheOptions, ClientCache, Notification};
use serde_json::Value;
use tracing::debug;

use crate::action::{Action, ActionContext};
use crate::gateway::GatewayEvent;
use crate::{channel, emoji, guild, message, reaction, user};

/// Holds one action per gateway event.
pub struct ActionDispatcher {
    actions: HashMap<GatewayEvent, Box<dyn Action>>,
}

impl Default for ActionDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionDispatcher {
    /// Create a dispatcher with every built-in action registered.
    pub fn new() -> Self {
        let mut dispatcher = Self::empty();
        dispatcher.register(Box::new(user::ReadyAction));
        dispatcher.register(Box::new(user::UserUpdateAction));
        dispatcher.register(Box::new(guild::GuildCreateAction));
        dispatcher.register(Box::new(guild::GuildUpdateAction));
        dispatcher.register(Box::new(guild::GuildDeleteAction));
        dispatcher.register(Box::new(emoji::GuildEmojisUpdateAction));
        dispatcher.register(Box::new(channel::ChannelCreateAction));
        dispatcher.register(Box::new(channel::ChannelUpdateAction));
        dispatcher.register(Box::new(channel::ChannelDeleteAction));
        dispatcher.register(Box::new(message::MessageCreateAction));
        dispatcher.register(Box::new(message::MessageUpdateAction));
        dispatcher.register(Box::new(message::MessageDeleteAction));
        dispatcher.register(Box::new(message::MessageDeleteBulkAction));
        dispatcher.register(Box::new(reaction::ReactionAddAction));
        dispatcher.register(Box::new(reaction::ReactionRemoveAction));
        dispatcher.register(Box::new(reaction::ReactionRemoveAllAction));
        dispatcher.register(Box::new(reaction::ReactionRemoveEmojiAction));
        dispatcher
    }

    /// Create a dispatcher with no actions.
    pub fn empty() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    /// Register an action, replacing any previous one for the same event.
    pub fn register(&mut self, action: Box<dyn Action>) {
        self.actions.insert(action.event(), action);
    }

    pub fn get(&self, event: GatewayEvent) -> Option<&dyn Action> {
        self.actions.get(&event).map(|a| a.as_ref())
    }

    pub fn events(&self) -> Vec<GatewayEvent> {
        GatewayEvent::ALL
            .into_iter()
            .filter(|event| self.actions.contains_key(event))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Run the action for `event` and return what it emitted.
    ///
    /// A malformed payload never fails the caller: the action's error comes
    /// back as a trailing `Warn` notification and the cache keeps whatever
    /// state the action had reached.
    pub fn dispatch(
        &self,
        event: GatewayEvent,
        payload: &Value,
        cache: &mut ClientCache,
        options: &CacheOptions,
    ) -> Vec<Notification> {
        let Some(action) = self.get(event) else {
            debug!(event = %event, "No action registered");
            return Vec::new();
        };

        let span = tracing::debug_span!("action", event = %event);
        let _enter = span.enter();

        let mut cx = ActionContext::new(cache, options);
        if let Err(e) = action.handle(payload, &mut cx) {
            cx.warn(format!("Dropped {event}: {e}"));
        }
        cx.into_notifications()
    }

    /// Dispatch by wire name. Unknown names are ignored.
    pub fn dispatch_raw(
        &self,
        name: &str,
        payload: &Value,
        cache: &mut ClientCache,
        options: &CacheOptions,
    ) -> Vec<Notification> {
        match name.parse::<GatewayEvent>() {
            Ok(event) => self.dispatch(event, payload, cache, options),
            Err(_) => {
                debug!(event = %name, "Ignoring unhandled gateway event");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::seeded_cache;
    use serde_json::json;

    #[test]
    fn every_event_has_an_action() {
        let dispatcher = ActionDispatcher::new();
        assert_eq!(dispatcher.len(), GatewayEvent::ALL.len());
        assert_eq!(dispatcher.events(), GatewayEvent::ALL.to_vec());
    }

    #[test]
    fn unknown_event_is_ignored() {
        let mut cache = seeded_cache();
        let before = cache.clone();
        let notifications =
            ActionDispatcher::new().dispatch_raw("TYPING_START", &json!({}), &mut cache, &CacheOptions::default());
        assert!(notifications.is_empty());
        assert_eq!(cache.guilds, before.guilds);
    }

    #[test]
    fn malformed_payload_becomes_warning() {
        let mut cache = seeded_cache();
        let notifications = ActionDispatcher::new().dispatch(
            GatewayEvent::GuildUpdate,
            &json!({"name": "no id"}),
            &mut cache,
            &CacheOptions::default(),
        );
        assert_eq!(notifications.len(), 1);
        match &notifications[0] {
            Notification::Warn { message } => assert!(message.contains("GUILD_UPDATE")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_dispatcher_emits_nothing() {
        let dispatcher = ActionDispatcher::empty();
        assert!(dispatcher.is_empty());
        let mut cache = seeded_cache();
        let notifications =
            dispatcher.dispatch(GatewayEvent::Ready, &json!({}), &mut cache, &CacheOptions::default());
        assert!(notifications.is_empty());
    }
}

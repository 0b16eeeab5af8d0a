//! Action trait and the context every action runs in.

use cordsync_core::{CacheOptions, ClientCache, Notification, PayloadError, Snowflake};
use serde::Deserialize;
use serde_json::Value;

use crate::gateway::GatewayEvent;

/// Handles one kind of gateway event.
///
/// Implementations mutate the cache through the context and emit a
/// notification for every observable change. Returning an error means the
/// payload was unusable; the dispatcher reports it as a warning.
pub trait Action: Send + Sync {
    /// The event this action handles.
    fn event(&self) -> GatewayEvent;

    fn handle(&self, payload: &Value, cx: &mut ActionContext<'_>) -> Result<(), PayloadError>;
}

/// Mutable view of the cache plus the notifications produced so far.
pub struct ActionContext<'a> {
    pub cache: &'a mut ClientCache,
    pub options: &'a CacheOptions,
    notifications: Vec<Notification>,
}

impl<'a> ActionContext<'a> {
    pub fn new(cache: &'a mut ClientCache, options: &'a CacheOptions) -> Self {
        Self {
            cache,
            options,
            notifications: Vec::new(),
        }
    }

    pub fn emit(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    /// Record something that was ignored on purpose.
    pub fn debug(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("{message}");
        self.notifications.push(Notification::Debug { message });
    }

    /// Record a payload problem. The event is dropped but processing goes on.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.notifications.push(Notification::Warn { message });
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn into_notifications(self) -> Vec<Notification> {
        self.notifications
    }
}

/// Read a required snowflake field from a payload.
pub fn snowflake(payload: &Value, entity: &'static str, field: &'static str) -> Result<Snowflake, PayloadError> {
    match payload.get(field) {
        None | Some(Value::Null) => Err(PayloadError::MissingField { entity, field }),
        Some(value) => Snowflake::deserialize(value).map_err(|e| PayloadError::Invalid {
            entity,
            reason: format!("{field}: {e}"),
        }),
    }
}

/// Read an optional snowflake field; a present but malformed value is still an error.
pub fn optional_snowflake(
    payload: &Value,
    entity: &'static str,
    field: &'static str,
) -> Result<Option<Snowflake>, PayloadError> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => snowflake(payload, entity, field).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snowflake_field_accepts_string_and_number() {
        let payload = json!({"a": "12", "b": 13});
        assert_eq!(snowflake(&payload, "x", "a").unwrap(), Snowflake(12));
        assert_eq!(snowflake(&payload, "x", "b").unwrap(), Snowflake(13));
    }

    #[test]
    fn missing_and_malformed_snowflakes() {
        let payload = json!({"a": null, "b": "not-a-number"});
        assert_eq!(
            snowflake(&payload, "x", "a").unwrap_err(),
            PayloadError::MissingField { entity: "x", field: "a" }
        );
        assert!(matches!(snowflake(&payload, "x", "b"), Err(PayloadError::Invalid { .. })));
        assert_eq!(optional_snowflake(&payload, "x", "c").unwrap(), None);
        assert!(optional_snowflake(&payload, "x", "b").is_err());
    }

    #[test]
    fn context_collects_diagnostics_in_order() {
        let mut cache = ClientCache::new();
        let options = CacheOptions::default();
        let mut cx = ActionContext::new(&mut cache, &options);
        cx.debug("first");
        cx.warn("second");
        let names: Vec<_> = cx.into_notifications().iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["debug", "warn"]);
    }
}

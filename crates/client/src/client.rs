//! The client: one entry point for the transport, one owner for timers.

use std::sync::Arc;
use std::time::Duration;

use cordsync_actions::{ActionDispatcher, GatewayEvent};
use cordsync_collectors::{
    Collector, CollectorHandle, CollectorHandler, CollectorOptions, MessageCollector, Outcome, ReactionCollector,
};
use cordsync_config::ClientConfig;
use cordsync_core::{CacheOptions, ClientCache, CollectorError, EventBus, Notification, Snowflake};
use parking_lot::{RwLock, RwLockReadGuard};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::timers::{TimerId, TimerSet};

/// Owns the cache, the action dispatcher, the notification bus and every
/// timer scheduled on its behalf.
///
/// Each raw event is reconciled and published under the cache lock, so
/// notifications reach subscribers in the order events were handled.
pub struct Client {
    config: ClientConfig,
    options: CacheOptions,
    cache: Arc<RwLock<ClientCache>>,
    dispatcher: ActionDispatcher,
    bus: EventBus,
    timers: TimerSet,
}

impl Client {
    /// Build a client from `config`.
    ///
    /// When message sweeping is configured the sweeper starts right away,
    /// which requires a Tokio runtime.
    pub fn new(config: ClientConfig) -> Self {
        let client = Self {
            options: config.cache_options(),
            bus: EventBus::new(config.event_bus_capacity),
            cache: Arc::new(RwLock::new(ClientCache::new())),
            dispatcher: ActionDispatcher::new(),
            timers: TimerSet::new(),
            config,
        };
        client.start_sweeper();
        client
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Read access to the cache. Hold the guard briefly: event handling
    /// waits for it.
    pub fn cache(&self) -> RwLockReadGuard<'_, ClientCache> {
        self.cache.read()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Notification>> {
        self.bus.subscribe()
    }

    pub fn timers(&self) -> &TimerSet {
        &self.timers
    }

    /// Reconcile one event by wire name. Unknown names produce nothing.
    pub fn handle_raw(&self, name: &str, payload: Value) -> Vec<Arc<Notification>> {
        let mut cache = self.cache.write();
        let notifications = self.dispatcher.dispatch_raw(name, &payload, &mut cache, &self.options);
        self.publish(notifications)
    }

    /// Reconcile one event and publish what changed.
    pub fn handle(&self, event: GatewayEvent, payload: Value) -> Vec<Arc<Notification>> {
        let mut cache = self.cache.write();
        let notifications = self.dispatcher.dispatch(event, &payload, &mut cache, &self.options);
        self.publish(notifications)
    }

    fn publish(&self, notifications: Vec<Notification>) -> Vec<Arc<Notification>> {
        notifications
            .into_iter()
            .map(|notification| {
                let notification = Arc::new(notification);
                self.bus.publish(Arc::clone(&notification));
                notification
            })
            .collect()
    }

    /// A message collector for a cached channel.
    pub fn message_collector(&self, channel_id: Snowflake) -> Result<MessageCollector, CollectorError> {
        let cache = self.cache.read();
        let channel = cache
            .channels
            .get(&channel_id)
            .ok_or_else(|| CollectorError::UnknownTarget(format!("channel {channel_id}")))?;
        Ok(MessageCollector::for_channel(channel))
    }

    /// A reaction collector for a cached message.
    pub fn reaction_collector(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
    ) -> Result<ReactionCollector, CollectorError> {
        let cache = self.cache.read();
        let message = cache
            .message(channel_id, message_id)
            .ok_or_else(|| CollectorError::UnknownTarget(format!("message {message_id} in channel {channel_id}")))?;
        Ok(ReactionCollector::for_message(message))
    }

    /// Start a collector on this client's bus. It runs in the client's timer
    /// set, so [`destroy`](Self::destroy) ends it.
    pub fn create_collector<H: CollectorHandler>(
        &self,
        handler: H,
        options: CollectorOptions<H>,
    ) -> Result<CollectorHandle<H>, CollectorError> {
        let collector = Collector::new(handler, options, self.bus.subscribe())?;
        let handle = collector.handle();
        self.timers.spawn(async move {
            collector.run().await;
        });
        Ok(handle)
    }

    pub fn create_message_collector(
        &self,
        channel_id: Snowflake,
        options: CollectorOptions<MessageCollector>,
    ) -> Result<CollectorHandle<MessageCollector>, CollectorError> {
        self.create_collector(self.message_collector(channel_id)?, options)
    }

    pub fn create_reaction_collector(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        options: CollectorOptions<ReactionCollector>,
    ) -> Result<CollectorHandle<ReactionCollector>, CollectorError> {
        self.create_collector(self.reaction_collector(channel_id, message_id)?, options)
    }

    /// Collect until an end condition and return everything collected.
    pub async fn await_collected<H: CollectorHandler>(
        &self,
        handler: H,
        options: CollectorOptions<H>,
    ) -> Result<Outcome<H::Key, H::Value>, CollectorError> {
        let handle = self.create_collector(handler, options)?;
        Ok(handle.ended().await)
    }

    /// Drop cached messages idle for longer than `lifetime`; returns how
    /// many were removed.
    pub fn sweep_messages(&self, lifetime: Duration) -> usize {
        sweep(&self.cache, lifetime)
    }

    /// Start the periodic message sweep if the configuration asks for one.
    fn start_sweeper(&self) -> Option<TimerId> {
        let (Some(lifetime), Some(every)) = (self.config.message_cache_lifetime(), self.config.message_sweep_interval())
        else {
            return None;
        };
        let cache = Arc::clone(&self.cache);
        let id = self.timers.set_interval(every, move || {
            sweep(&cache, lifetime);
        });
        info!(lifetime_secs = lifetime.as_secs(), interval_secs = every.as_secs(), "Message sweeper started");
        Some(id)
    }

    pub fn set_timeout(&self, delay: Duration, callback: impl FnOnce() + Send + 'static) -> TimerId {
        self.timers.set_timeout(delay, callback)
    }

    pub fn clear_timeout(&self, id: TimerId) -> bool {
        self.timers.clear(id)
    }

    pub fn set_interval(&self, period: Duration, callback: impl FnMut() + Send + 'static) -> TimerId {
        self.timers.set_interval(period, callback)
    }

    pub fn clear_interval(&self, id: TimerId) -> bool {
        self.timers.clear(id)
    }

    /// Cancel every timer, interval, sweeper and collector this client
    /// started. Collectors end with reason `sourceClosed`.
    pub fn destroy(&self) {
        let cleared = self.timers.clear_all();
        info!(cleared, "Client destroyed");
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("bus", &self.bus)
            .field("timers", &self.timers)
            .finish_non_exhaustive()
    }
}

fn sweep(cache: &RwLock<ClientCache>, lifetime: Duration) -> usize {
    let lifetime_ms = i64::try_from(lifetime.as_millis()).unwrap_or(i64::MAX);
    let cutoff = chrono::Utc::now().timestamp_millis().saturating_sub(lifetime_ms);
    let removed = cache.write().sweep_messages(cutoff);
    if removed > 0 {
        debug!(removed, "Swept messages");
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use cordsync_collectors::EndReason;
    use serde_json::json;

    const GUILD: Snowflake = Snowflake(1);
    const CHANNEL: Snowflake = Snowflake(20);

    fn ready_client(config: ClientConfig) -> Client {
        let client = Client::new(config);
        client.handle_raw("READY", json!({"user": {"id": "99", "username": "bot", "bot": true}, "guilds": []}));
        client.handle_raw(
            "GUILD_CREATE",
            json!({
                "id": GUILD,
                "name": "Rust",
                "emojis": [],
                "channels": [{"id": CHANNEL, "type": 0, "name": "general"}],
            }),
        );
        client
    }

    fn message(id: Snowflake, content: &str) -> Value {
        json!({
            "id": id,
            "channel_id": CHANNEL,
            "guild_id": GUILD,
            "author": {"id": "2", "username": "ferris"},
            "content": content,
        })
    }

    #[tokio::test]
    async fn notifications_are_published_in_order() {
        let client = ready_client(ClientConfig::default());
        let mut rx = client.subscribe();

        let returned = client.handle_raw("MESSAGE_CREATE", message(Snowflake(30), "one"));
        client.handle(GatewayEvent::MessageDelete, json!({"id": "30", "channel_id": CHANNEL}));

        assert_eq!(returned.len(), 1);
        assert_eq!(rx.recv().await.unwrap().name(), "message_create");
        assert_eq!(rx.recv().await.unwrap().name(), "message_delete");
    }

    #[tokio::test]
    async fn unknown_events_publish_nothing() {
        let client = Client::new(ClientConfig::default());
        assert!(client.handle_raw("TYPING_START", json!({})).is_empty());
    }

    #[tokio::test]
    async fn ready_and_guild_create_fill_the_cache() {
        let client = ready_client(ClientConfig::default());
        let cache = client.cache();
        assert_eq!(cache.current_user_id(), Some(Snowflake(99)));
        assert!(cache.guilds.get(&GUILD).unwrap().channels.contains(&CHANNEL));
    }

    #[tokio::test]
    async fn message_collector_ends_at_limit() {
        let client = ready_client(ClientConfig::default());
        let handler = client.message_collector(CHANNEL).unwrap().with_max(2);
        let handle = client.create_collector(handler, CollectorOptions::default()).unwrap();

        client.handle_raw("MESSAGE_CREATE", message(Snowflake(31), "one"));
        client.handle_raw("MESSAGE_CREATE", message(Snowflake(32), "two"));
        client.handle_raw("MESSAGE_CREATE", message(Snowflake(33), "three"));

        let outcome = handle.ended().await;
        assert_eq!(outcome.reason, EndReason::Limit);
        assert_eq!(outcome.collected.len(), 2);
    }

    #[tokio::test]
    async fn reaction_collector_sees_reactions() {
        let client = ready_client(ClientConfig::default());
        client.handle_raw("MESSAGE_CREATE", message(Snowflake(30), "vote"));
        let handler = client.reaction_collector(CHANNEL, Snowflake(30)).unwrap().with_max_users(1);
        let handle = client.create_collector(handler, CollectorOptions::default()).unwrap();

        client.handle_raw(
            "MESSAGE_REACTION_ADD",
            json!({"user_id": "2", "channel_id": CHANNEL, "message_id": "30", "guild_id": GUILD, "emoji": {"name": "👍"}}),
        );

        let outcome = handle.ended().await;
        assert_eq!(outcome.reason, EndReason::UserLimit);
        assert_eq!(outcome.collected["👍"].count, 1);
    }

    #[tokio::test]
    async fn collectors_need_a_cached_target() {
        let client = ready_client(ClientConfig::default());
        assert!(matches!(
            client.create_message_collector(Snowflake(404), CollectorOptions::default()),
            Err(CollectorError::UnknownTarget(_))
        ));
        assert!(matches!(
            client.reaction_collector(CHANNEL, Snowflake(404)),
            Err(CollectorError::UnknownTarget(_))
        ));
    }

    #[tokio::test]
    async fn channel_delete_ends_message_collector() {
        let client = ready_client(ClientConfig::default());
        let handle = client.create_message_collector(CHANNEL, CollectorOptions::default()).unwrap();
        client.handle_raw("CHANNEL_DELETE", json!({"id": CHANNEL, "type": 0, "guild_id": GUILD}));
        assert_eq!(handle.ended().await.reason, EndReason::ChannelDelete);
    }

    #[tokio::test]
    async fn sweep_removes_stale_messages() {
        let client = ready_client(ClientConfig::default());
        let stale = Snowflake::from_timestamp_ms(1_500_000_000_000);
        client.handle_raw("MESSAGE_CREATE", message(stale, "old"));
        let fresh = Snowflake::from_timestamp_ms(chrono::Utc::now().timestamp_millis() as u64);
        client.handle_raw("MESSAGE_CREATE", message(fresh, "new"));

        assert_eq!(client.sweep_messages(Duration::from_secs(3600)), 1);
        let cache = client.cache();
        let messages = &cache.channels.get(&CHANNEL).unwrap().messages;
        assert!(messages.contains(&fresh));
        assert!(!messages.contains(&stale));
    }

    #[tokio::test(start_paused = true)]
    async fn configured_sweeper_runs_on_its_interval() {
        let config = ClientConfig {
            message_cache_lifetime_secs: 60,
            message_sweep_interval_secs: 10,
            ..ClientConfig::default()
        };
        let client = ready_client(config);
        assert_eq!(client.timers().len(), 1);

        let stale = Snowflake::from_timestamp_ms(1_500_000_000_000);
        client.handle_raw("MESSAGE_CREATE", message(stale, "old"));
        tokio::time::sleep(Duration::from_secs(11)).await;

        assert!(client.cache().message(CHANNEL, stale).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn destroy_cancels_timers_and_collectors() {
        let client = ready_client(ClientConfig::default());
        let fired = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        client.set_timeout(Duration::from_secs(1), move || flag.store(true, std::sync::atomic::Ordering::SeqCst));
        let handle = client.create_message_collector(CHANNEL, CollectorOptions::default()).unwrap();
        tokio::task::yield_now().await;

        client.destroy();
        assert!(client.timers().is_empty());
        assert_eq!(handle.ended().await.reason, EndReason::SourceClosed);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!fired.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn cleared_interval_reports_once() {
        let client = Client::new(ClientConfig::default());
        let id = client.set_interval(Duration::from_secs(60), || {});
        assert!(client.clear_interval(id));
        assert!(!client.clear_interval(id));
    }
}

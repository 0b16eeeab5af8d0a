//! Collects messages sent in one channel.

use cordsync_core::{Channel, CollectorError, Message, Notification, Snowflake};

use crate::handler::{Collection, CollectorHandler, Handled};
use crate::options::positive;
use crate::reason::EndReason;

#[derive(Debug, Clone)]
pub struct MessageCollector {
    channel_id: Snowflake,
    guild_id: Option<Snowflake>,
    /// End after this many messages were collected.
    max: Option<usize>,
    /// End after this many messages were seen, collected or not.
    max_processed: Option<usize>,
}

impl MessageCollector {
    pub fn new(channel_id: Snowflake, guild_id: Option<Snowflake>) -> Self {
        Self {
            channel_id,
            guild_id,
            max: None,
            max_processed: None,
        }
    }

    pub fn for_channel(channel: &Channel) -> Self {
        Self::new(channel.id, channel.guild_id)
    }

    pub fn with_max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    pub fn with_max_processed(mut self, max_processed: usize) -> Self {
        self.max_processed = Some(max_processed);
        self
    }

    pub fn channel_id(&self) -> Snowflake {
        self.channel_id
    }

    fn removal(message: &Message) -> Handled<Snowflake, Message, Message> {
        Handled::Remove {
            item: message.clone(),
            dispose: Some(message.id),
            notify: false,
        }
    }
}

impl CollectorHandler for MessageCollector {
    type Key = Snowflake;
    type Value = Message;
    type Item = Message;

    fn handle(
        &mut self,
        notification: &Notification,
        _collected: &Collection<Snowflake, Message>,
    ) -> Vec<Handled<Snowflake, Message, Message>> {
        match notification {
            Notification::MessageCreate { message } if message.channel_id == self.channel_id => {
                vec![Handled::Collect {
                    key: message.id,
                    value: message.clone(),
                    item: message.clone(),
                }]
            }
            Notification::MessageDelete { message } if message.channel_id == self.channel_id => {
                vec![Self::removal(message)]
            }
            Notification::MessageDeleteBulk { channel_id, messages } if *channel_id == self.channel_id => {
                messages.iter().map(Self::removal).collect()
            }
            Notification::ChannelDelete { channel } if channel.id == self.channel_id => {
                vec![Handled::End(EndReason::ChannelDelete)]
            }
            Notification::GuildDelete { guild } if Some(guild.id) == self.guild_id => {
                vec![Handled::End(EndReason::GuildDelete)]
            }
            _ => Vec::new(),
        }
    }

    fn post_check(&self, collected: &Collection<Snowflake, Message>, received: usize) -> Option<EndReason> {
        if self.max.is_some_and(|max| collected.len() >= max) {
            return Some(EndReason::Limit);
        }
        if self.max_processed.is_some_and(|max| received >= max) {
            return Some(EndReason::ProcessedLimit);
        }
        None
    }

    fn validate(&self) -> Result<(), CollectorError> {
        positive("max", self.max)?;
        positive("max_processed", self.max_processed)
    }

    fn cleanup(&mut self) {
        tracing::debug!(channel = %self.channel_id, "Message collector detached");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{Collector, CollectorHandle};
    use crate::options::CollectorOptions;
    use cordsync_core::{EventBus, Guild};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    const CHANNEL: Snowflake = Snowflake(20);

    fn message(id: u64, channel: Snowflake, content: &str) -> Message {
        Message::from_raw(
            &json!({"id": id.to_string(), "content": content, "author": {"id": "2"}}),
            channel,
            Some(Snowflake(1)),
        )
        .unwrap()
    }

    fn created(message: Message) -> Arc<Notification> {
        Arc::new(Notification::MessageCreate { message })
    }

    fn start(
        collector: MessageCollector,
        options: CollectorOptions<MessageCollector>,
    ) -> (EventBus, CollectorHandle<MessageCollector>) {
        let bus = EventBus::new(32);
        let (handle, _task) = Collector::new(collector, options, bus.subscribe()).unwrap().spawn();
        (bus, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn collects_only_its_channel() {
        let (bus, handle) = start(MessageCollector::new(CHANNEL, Some(Snowflake(1))).with_max(2), Default::default());
        bus.publish(created(message(1, Snowflake(21), "elsewhere")));
        bus.publish(created(message(2, CHANNEL, "one")));
        bus.publish(created(message(3, CHANNEL, "two")));

        let outcome = handle.ended().await;
        assert_eq!(outcome.reason, EndReason::Limit);
        let ids: Vec<_> = outcome.collected.keys().copied().collect();
        assert_eq!(ids, vec![Snowflake(2), Snowflake(3)]);
        assert_eq!(handle.received(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn processed_limit_counts_filtered_messages() {
        let options: CollectorOptions<MessageCollector> = CollectorOptions::default()
            .with_filter(|message: &Message, _| message.content.as_deref() == Some("yes"));
        let (bus, handle) = start(MessageCollector::new(CHANNEL, None).with_max_processed(3), options);
        for (id, content) in [(1, "no"), (2, "yes"), (3, "no"), (4, "yes")] {
            bus.publish(created(message(id, CHANNEL, content)));
        }

        let outcome = handle.ended().await;
        assert_eq!(outcome.reason, EndReason::ProcessedLimit);
        assert_eq!(outcome.collected.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deletes_are_disposed() {
        let options = CollectorOptions::default().with_dispose(true).with_time(Duration::from_millis(10));
        let (bus, handle) = start(MessageCollector::new(CHANNEL, None), options);
        bus.publish(created(message(1, CHANNEL, "a")));
        bus.publish(created(message(2, CHANNEL, "b")));
        bus.publish(created(message(3, CHANNEL, "c")));
        bus.publish(Arc::new(Notification::MessageDelete { message: message(1, CHANNEL, "a") }));
        bus.publish(Arc::new(Notification::MessageDeleteBulk {
            channel_id: CHANNEL,
            messages: vec![message(2, CHANNEL, "b")],
        }));

        let outcome = handle.ended().await;
        let ids: Vec<_> = outcome.collected.keys().copied().collect();
        assert_eq!(ids, vec![Snowflake(3)]);
    }

    #[tokio::test(start_paused = true)]
    async fn channel_deletion_ends_collection() {
        let (bus, handle) = start(MessageCollector::new(CHANNEL, None), Default::default());
        bus.publish(Arc::new(Notification::ChannelDelete {
            channel: Channel::partial(CHANNEL, None, None),
        }));
        assert_eq!(handle.ended().await.reason, EndReason::ChannelDelete);
    }

    #[tokio::test(start_paused = true)]
    async fn guild_deletion_ends_collection() {
        let (bus, handle) = start(MessageCollector::new(CHANNEL, Some(Snowflake(1))), Default::default());
        bus.publish(Arc::new(Notification::GuildDelete {
            guild: Guild::unavailable(Snowflake(1)),
        }));
        assert_eq!(handle.ended().await.reason, EndReason::GuildDelete);
    }

    #[tokio::test]
    async fn zero_limits_are_rejected() {
        let bus = EventBus::new(4);
        let result = Collector::new(MessageCollector::new(CHANNEL, None).with_max(0), Default::default(), bus.subscribe());
        assert!(matches!(result.err(), Some(CollectorError::InvalidOption { option: "max", .. })));
    }
}

//! `cordsync collect-messages`: Run a message collector over a recorded log.

use cordsync_client::{Client, read_log};
use cordsync_collectors::{CollectorHandle, CollectorOptions, MessageCollector};
use cordsync_core::Snowflake;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub struct CollectArgs {
    pub channel: u64,
    pub max: Option<usize>,
    pub time: Option<u64>,
    pub idle: Option<u64>,
}

impl CollectArgs {
    fn options(&self) -> CollectorOptions<MessageCollector> {
        let mut options = CollectorOptions::default().with_dispose(true);
        if let Some(ms) = self.time {
            options = options.with_time(Duration::from_millis(ms));
        }
        if let Some(ms) = self.idle {
            options = options.with_idle(Duration::from_millis(ms));
        }
        options
    }
}

/// The collector starts once the log has cached the channel; events before
/// that point are only reconciled.
pub async fn run(config_path: &Path, file: &Path, args: CollectArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let events = read_log(file)?;
    let client = Client::new(config);
    let channel_id = Snowflake(args.channel);

    let mut handle: Option<CollectorHandle<MessageCollector>> = None;
    for event in &events {
        if handle.is_none() && client.cache().channels.contains(&channel_id) {
            let mut collector = client.message_collector(channel_id)?;
            if let Some(max) = args.max {
                collector = collector.with_max(max);
            }
            handle = Some(client.create_collector(collector, args.options())?);
            debug!(channel = %channel_id, "Collector started");
        }
        client.handle_raw(&event.t, event.d.clone());
        // Let the collector drain the bus before the next event.
        tokio::task::yield_now().await;
        if handle.as_ref().is_some_and(|h| h.is_ended()) {
            break;
        }
    }

    let Some(handle) = handle else {
        client.destroy();
        return Err(format!("channel {channel_id} was not cached before {} ended", file.display()).into());
    };

    // Without a timer nothing else can end the collector once the log is exhausted.
    if args.time.is_none() && args.idle.is_none() {
        handle.stop_with("logEnd");
    }
    let outcome = handle.ended().await;
    info!(reason = %outcome.reason, collected = outcome.collected.len(), "Collection finished");

    let report = serde_json::json!({
        "reason": outcome.reason,
        "received": handle.received(),
        "collected": outcome.collected.values().collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    client.destroy();
    Ok(())
}

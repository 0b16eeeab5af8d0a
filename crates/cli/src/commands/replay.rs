//! `cordsync replay`: Print every notification a recorded log produces.

use cordsync_client::{Client, read_log};
use std::path::Path;
use tracing::info;

pub async fn run(config_path: &Path, file: &Path, diagnostics: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let events = read_log(file)?;
    let client = Client::new(config);

    let mut printed = 0usize;
    for event in &events {
        for notification in client.handle_raw(&event.t, event.d.clone()) {
            if notification.is_diagnostic() && !diagnostics {
                continue;
            }
            println!("{}", serde_json::to_string(&*notification)?);
            printed += 1;
        }
    }

    {
        let cache = client.cache();
        info!(
            events = events.len(),
            notifications = printed,
            guilds = cache.guilds.len(),
            channels = cache.channels.len(),
            users = cache.users.len(),
            "Replay finished"
        );
    }
    client.destroy();
    Ok(())
}

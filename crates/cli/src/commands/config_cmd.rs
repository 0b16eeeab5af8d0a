//! `cordsync config`: Configuration management commands.

use std::path::Path;

pub fn validate(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating {}...", config_path.display());

    match super::load_config(config_path) {
        Ok(config) => {
            println!("   Config parsed successfully");

            let mut warnings = Vec::new();
            if config.token.is_none() {
                warnings.push("No token set (set CORDSYNC_TOKEN)".to_string());
            }
            if config.message_cache_max_size == 0 && !config.partials.is_empty() {
                warnings.push("Message caching is disabled; partial messages will not be kept".to_string());
            }
            if config.message_cache_lifetime_secs > 0 && config.message_sweep_interval_secs == 0 {
                warnings.push("message_cache_lifetime_secs has no effect without message_sweep_interval_secs".to_string());
            }

            if warnings.is_empty() {
                println!("   All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   warning: {w}");
                }
            }

            println!();
            let partials: Vec<_> = config.partials.iter().map(ToString::to_string).collect();
            println!("   Partials:       {}", if partials.is_empty() { "none".into() } else { partials.join(", ") });
            println!("   Message cache:  {}", describe_cache_size(config.message_cache_max_size));
            println!("   Sweep:          {}", describe_sweep(config.message_cache_lifetime_secs, config.message_sweep_interval_secs));
            println!("   Bus capacity:   {}", config.event_bus_capacity);
        }
        Err(e) => {
            println!("   Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub fn show(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    if config.token.is_some() {
        config.token = Some("[REDACTED]".into());
    }
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub fn path(config_path: &Path) {
    println!("{}", config_path.display());
}

fn describe_cache_size(size: i64) -> String {
    match size {
        0 => "disabled".into(),
        n if n < 0 => "unlimited".into(),
        n => format!("{n} per channel"),
    }
}

fn describe_sweep(lifetime: u64, interval: u64) -> String {
    match (lifetime, interval) {
        (0, _) | (_, 0) => "off".into(),
        (lifetime, interval) => format!("every {interval}s, lifetime {lifetime}s"),
    }
}

//! Configuration loading, validation, and management for cordsync.
//!
//! Loads configuration from `~/.cordsync/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use cordsync_core::{CacheOptions, PartialKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.cordsync/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Bot token, handed to the transport; never logged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Entity kinds that may be materialized as partial stubs
    #[serde(default)]
    pub partials: Vec<PartialKind>,

    /// Messages cached per channel (negative = unlimited, 0 = none)
    #[serde(default = "default_message_cache_max_size")]
    pub message_cache_max_size: i64,

    /// How long a message stays cached after its last activity (0 = forever)
    #[serde(default)]
    pub message_cache_lifetime_secs: u64,

    /// How often the message sweeper runs (0 = never)
    #[serde(default)]
    pub message_sweep_interval_secs: u64,

    /// Buffered notifications per subscriber before it starts lagging
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_message_cache_max_size() -> i64 {
    200
}
fn default_event_bus_capacity() -> usize {
    256
}
fn default_log_level() -> String {
    "info".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("token", &redact(&self.token))
            .field("partials", &self.partials)
            .field("message_cache_max_size", &self.message_cache_max_size)
            .field("message_cache_lifetime_secs", &self.message_cache_lifetime_secs)
            .field("message_sweep_interval_secs", &self.message_sweep_interval_secs)
            .field("event_bus_capacity", &self.event_bus_capacity)
            .field("logging", &self.logging)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl ClientConfig {
    /// Load configuration from the default path (~/.cordsync/config.toml).
    ///
    /// Also checks environment variables:
    /// - `CORDSYNC_TOKEN` (overrides the file's token)
    /// - `CORDSYNC_PARTIALS` (comma-separated, replaces the file's list)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(token) = lookup("CORDSYNC_TOKEN") {
            self.token = Some(token);
        }

        if let Some(partials) = lookup("CORDSYNC_PARTIALS") {
            self.partials = partials
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.parse::<PartialKind>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(ConfigError::ValidationError)?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".cordsync")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_bus_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "event_bus_capacity must be greater than 0".into(),
            ));
        }

        if self.message_sweep_interval_secs > 0 && self.message_cache_lifetime_secs == 0 {
            return Err(ConfigError::ValidationError(
                "message_sweep_interval_secs requires message_cache_lifetime_secs > 0".into(),
            ));
        }

        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of trace, debug, info, warn, error (got {:?})",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Resolver settings derived from this configuration.
    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            partials: self.partials.iter().copied().collect(),
            message_cache_max_size: usize::try_from(self.message_cache_max_size).ok(),
        }
    }

    pub fn message_cache_lifetime(&self) -> Option<Duration> {
        (self.message_cache_lifetime_secs > 0).then(|| Duration::from_secs(self.message_cache_lifetime_secs))
    }

    pub fn message_sweep_interval(&self) -> Option<Duration> {
        (self.message_sweep_interval_secs > 0).then(|| Duration::from_secs(self.message_sweep_interval_secs))
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            token: None,
            partials: vec![],
            message_cache_max_size: default_message_cache_max_size(),
            message_cache_lifetime_secs: 0,
            message_sweep_interval_secs: 0,
            event_bus_capacity: default_event_bus_capacity(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

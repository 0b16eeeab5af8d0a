pub mod collect;
pub mod config_cmd;
pub mod replay;

use cordsync_config::{ClientConfig, ConfigError};
use std::path::{Path, PathBuf};

pub fn default_config_path() -> PathBuf {
    ClientConfig::config_dir().join("config.toml")
}

/// Load `path`, apply `CORDSYNC_*` overrides and validate the result.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    let mut config = ClientConfig::load_from(path)?;
    config.apply_env(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

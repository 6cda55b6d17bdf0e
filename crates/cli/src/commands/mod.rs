pub mod analyze;
pub mod config_cmd;
pub mod memory;
pub mod reports;
pub mod status;

use anyhow::Context;
use std::path::{Path, PathBuf};
use windowscout_config::AppConfig;

/// The config file `--config` names, or the default location.
pub fn config_file(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

/// Load, apply environment overrides, validate.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let Some(path) = path else {
        return AppConfig::load().context("Failed to load config");
    };
    let mut config = AppConfig::load_from(path).context("Failed to load config")?;
    config.apply_env(|key| std::env::var(key).ok());
    config.validate().context("Invalid config")?;
    Ok(config)
}

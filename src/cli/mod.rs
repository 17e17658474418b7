//! CLI command handlers

pub mod check;
pub mod run;
pub mod signal;
pub mod status;

use anyhow::Context;
use oslog_collector::Config;
use std::path::{Path, PathBuf};

/// Explicit path, or the per-user default
pub fn config_path(explicit: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    let dir = dirs::config_dir().context("no config directory on this platform, pass a config file")?;
    Ok(dir.join("oslog-collector").join("config.yaml"))
}

pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    Config::load(path).with_context(|| format!("error loading config {}", path.display()))
}

/// The `pid_file` of a config, which every control command needs
pub fn pid_file(config: &Config) -> anyhow::Result<&Path> {
    config
        .pid_file
        .as_deref()
        .context("config has no pid_file, cannot find the running agent")
}

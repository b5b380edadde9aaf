//! Platform-aware paths for cpp-properties

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

const APP_DIR: &str = "cpp-properties";

/// Directory holding `config.toml`
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(custom_dir) = env::var("CPP_PROPERTIES_CONFIG_DIR") {
        return Ok(PathBuf::from(custom_dir));
    }

    dirs::config_dir()
        .map(|p| p.join(APP_DIR))
        .context("Unable to determine config directory for the current platform")
}

/// Directory holding persisted folder state
pub fn data_dir() -> Result<PathBuf> {
    if let Ok(custom_dir) = env::var("CPP_PROPERTIES_DATA_DIR") {
        return Ok(PathBuf::from(custom_dir));
    }

    dirs::data_dir()
        .map(|p| p.join(APP_DIR))
        .context("Unable to determine data directory for the current platform")
}

pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

pub fn default_state_file() -> Result<PathBuf> {
    Ok(data_dir()?.join("folder_state.json"))
}

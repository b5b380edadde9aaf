//! Engine configuration: `config.toml` plus `CPP_PROPERTIES_*` environment overrides

pub mod paths;

pub use paths::{config_dir, config_file, data_dir, default_state_file};

use crate::core::errors::ConfigError;
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "CPP_PROPERTIES_";

/// Configuration actions
#[derive(Debug, Clone, Subcommand)]
pub enum ConfigAction {
    /// Write a default config.toml if none exists
    Init,
    /// Show the effective configuration
    Show,
}

/// Tunables for the properties engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seconds between fallback checks of c_cpp_properties.json
    pub fallback_poll_secs: u64,
    pub watch_compile_commands: bool,
    pub scan_vcpkg: bool,
    /// Where selected configuration indexes are persisted
    pub state_file: Option<PathBuf>,
    pub log_level: String,
    pub notify_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fallback_poll_secs: 2,
            watch_compile_commands: true,
            scan_vcpkg: true,
            state_file: None,
            log_level: "info".to_string(),
            notify_capacity: 100,
        }
    }
}

impl EngineConfig {
    /// Load `config.toml` from the platform config directory, then apply env overrides
    pub fn load() -> Result<Self, ConfigError> {
        let path = paths::config_file().map_err(|e| ConfigError::InvalidValue {
            field: "config_dir".to_string(),
            value: String::new(),
            reason: e.to_string(),
        })?;
        let config = if path.exists() {
            Self::from_file(&path)?
        } else {
            debug!("No engine config at {}; using defaults", path.display());
            Self::default()
        };
        let config = config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => ConfigError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => ConfigError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        info!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `CPP_PROPERTIES_*` variables; malformed values are errors
    pub fn apply_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(val) = env::var(format!("{ENV_PREFIX}FALLBACK_POLL_SECS")) {
            self.fallback_poll_secs = val.parse()?;
            debug!("Applied env override: fallback_poll_secs = {}", self.fallback_poll_secs);
        }

        if let Ok(val) = env::var(format!("{ENV_PREFIX}WATCH_COMPILE_COMMANDS")) {
            self.watch_compile_commands = val.parse()?;
            debug!(
                "Applied env override: watch_compile_commands = {}",
                self.watch_compile_commands
            );
        }

        if let Ok(val) = env::var(format!("{ENV_PREFIX}SCAN_VCPKG")) {
            self.scan_vcpkg = val.parse()?;
            debug!("Applied env override: scan_vcpkg = {}", self.scan_vcpkg);
        }

        if let Ok(val) = env::var(format!("{ENV_PREFIX}STATE_FILE")) {
            debug!("Applied env override: state_file = {}", val);
            self.state_file = Some(PathBuf::from(val));
        }

        if let Ok(val) = env::var(format!("{ENV_PREFIX}LOG_LEVEL")) {
            debug!("Applied env override: log_level = {}", val);
            self.log_level = val;
        }

        if let Ok(val) = env::var(format!("{ENV_PREFIX}NOTIFY_CAPACITY")) {
            self.notify_capacity = val.parse()?;
            debug!("Applied env override: notify_capacity = {}", self.notify_capacity);
        }

        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fallback_poll_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "fallback_poll_secs".to_string(),
                value: "0".to_string(),
                reason: "poll interval must be at least one second".to_string(),
            });
        }
        if self.notify_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "notify_capacity".to_string(),
                value: "0".to_string(),
                reason: "notification channel needs room for at least one event".to_string(),
            });
        }
        Ok(())
    }

    pub fn fallback_poll_interval(&self) -> Duration {
        Duration::from_secs(self.fallback_poll_secs)
    }

    /// Configured state file, else the platform default
    pub fn resolved_state_file(&self) -> Option<PathBuf> {
        self.state_file
            .clone()
            .or_else(|| paths::default_state_file().ok())
    }
}

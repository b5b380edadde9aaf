/// Domain-specific error types for cpp-properties using thiserror
///
/// Parse and structural failures propagate to the caller of the store operation that hit them.
/// Everything else (write failures, watch limits, provider registration problems) is absorbed
/// where it is detected and only logged or surfaced as a user message.
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, reconciling or persisting a workspace folder's configuration
#[derive(Error, Debug)]
pub enum PropertiesError {
    #[error("Failed to parse \"{path}\": {message}")]
    Syntax { path: PathBuf, message: String },

    #[error("Invalid configuration file \"{path}\": {reason}")]
    Structural { path: PathBuf, reason: String },

    #[error("Failed to read \"{path}\"")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Attempt to update \"{path}\" failed (do you have write access?)")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to watch {path}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("Watch handle limit reached while watching {path}")]
    WatchLimit { path: PathBuf },

    #[error("Invalid settings in \"{path}\": {message}")]
    Settings { path: PathBuf, message: String },

    #[error("Folder state error for {path}: {reason}")]
    State { path: PathBuf, reason: String },
}

impl PropertiesError {
    /// True for failures that propagate to the caller instead of being absorbed
    pub fn is_parse_failure(&self) -> bool {
        matches!(
            self,
            Self::Syntax { .. } | Self::Structural { .. } | Self::Read { .. }
        )
    }
}

/// Result type alias for store operations
pub type PropertiesResult<T> = Result<T, PropertiesError>;

/// Reasons a provider registration is refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("CustomConfigurationProvider was not registered. The following properties are missing from the implementation: {}", .missing.join(", "))]
    MissingCapabilities {
        provider: String,
        missing: Vec<&'static str>,
    },

    #[error("CustomConfigurationProvider '{id}' has already been registered.")]
    Duplicate { id: String },
}

/// Engine configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Failed to parse configuration file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Configuration I/O failed on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl From<std::num::ParseIntError> for ConfigError {
    fn from(err: std::num::ParseIntError) -> Self {
        ConfigError::InvalidValue {
            field: "numeric_field".to_string(),
            value: "invalid_number".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<std::str::ParseBoolError> for ConfigError {
    fn from(err: std::str::ParseBoolError) -> Self {
        ConfigError::InvalidValue {
            field: "boolean_field".to_string(),
            value: "invalid_boolean".to_string(),
            reason: err.to_string(),
        }
    }
}

//! c_cpp_properties.json data structures
//!
//! Persisted fields use [`Setting`] so that "absent", "explicitly defaulted" and "concrete"
//! stay distinguishable through a load/save cycle. Resolved output lives in
//! [`ResolvedConfiguration`] and is never written back.

use crate::core::platform::HostPlatform;
use crate::core::variables::{EnvValue, Environment, DEFAULT_TOKEN};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Schema version written by this engine
pub const CURRENT_VERSION: i64 = 4;

/// First include path entry of a defaulted configuration
pub const DEFAULT_INCLUDE_ROOT: &str = "${workspaceFolder}";

/// Environment keys injected by the engine that a document may not override
pub const RESERVED_ENV_KEYS: [&str; 4] = [
    "workspaceRoot",
    "workspaceFolder",
    "workspaceFolderBasename",
    "default",
];

/// Three-state field value
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Setting<T> {
    /// Field absent from the document
    #[default]
    Unset,
    /// `null` or `"${default}"`: take the settings-level default
    UseDefault,
    Value(T),
}

impl<T> Setting<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// True for a concrete value
    pub fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn value_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> From<Option<T>> for Setting<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Unset, Self::Value)
    }
}

impl<T: Serialize> Serialize for Setting<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Unset => serializer.serialize_none(),
            Self::UseDefault => serializer.serialize_str(DEFAULT_TOKEN),
            Self::Value(value) => value.serialize(serializer),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Setting<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(Self::UseDefault),
            Value::String(s) if s == DEFAULT_TOKEN => Ok(Self::UseDefault),
            other => serde_json::from_value(other)
                .map(Self::Value)
                .map_err(D::Error::custom),
        }
    }
}

/// Symbol-database settings of one configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Browse {
    #[serde(default, skip_serializing_if = "Setting::is_unset")]
    pub path: Setting<Vec<String>>,
    #[serde(default, skip_serializing_if = "Setting::is_unset")]
    pub limit_symbols_to_included_headers: Setting<bool>,
    #[serde(default, skip_serializing_if = "Setting::is_unset")]
    pub database_filename: Setting<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One named compiler/analysis profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Setting::is_unset")]
    pub include_path: Setting<Vec<String>>,
    #[serde(default, skip_serializing_if = "Setting::is_unset")]
    pub defines: Setting<Vec<String>>,
    #[serde(default, skip_serializing_if = "Setting::is_unset")]
    pub mac_framework_path: Setting<Vec<String>>,
    #[serde(default, skip_serializing_if = "Setting::is_unset")]
    pub windows_sdk_version: Setting<String>,
    #[serde(default, skip_serializing_if = "Setting::is_unset")]
    pub compiler_path: Setting<String>,
    #[serde(default, skip_serializing_if = "Setting::is_unset")]
    pub c_standard: Setting<String>,
    #[serde(default, skip_serializing_if = "Setting::is_unset")]
    pub cpp_standard: Setting<String>,
    #[serde(default, skip_serializing_if = "Setting::is_unset")]
    pub intelli_sense_mode: Setting<String>,
    #[serde(default, skip_serializing_if = "Setting::is_unset")]
    pub compile_commands: Setting<String>,
    #[serde(default, skip_serializing_if = "Setting::is_unset")]
    pub forced_include: Setting<Vec<String>>,
    #[serde(default, skip_serializing_if = "Setting::is_unset")]
    pub configuration_provider: Setting<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browse: Option<Browse>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Configuration {
    /// The configuration synthesized when no document exists
    pub fn platform_default(platform: HostPlatform) -> Self {
        Self {
            name: platform.config_name().to_string(),
            browse: Some(Browse::default()),
            ..Self::default()
        }
    }
}

/// The persisted unit: `{ configurations, env?, version }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationDocument {
    pub configurations: Vec<Configuration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<Environment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConfigurationDocument {
    /// Single-entry document for the host platform at the current schema version
    pub fn platform_default(platform: HostPlatform) -> Self {
        Self {
            configurations: vec![Configuration::platform_default(platform)],
            env: None,
            version: Some(CURRENT_VERSION),
            extra: Map::new(),
        }
    }

    /// Drop reserved keys from the user environment; returns how many were removed
    pub fn strip_reserved_env(&mut self) -> usize {
        let Some(env) = self.env.as_mut() else {
            return 0;
        };
        RESERVED_ENV_KEYS
            .iter()
            .filter(|key| env.shift_remove(**key).is_some())
            .count()
    }

    /// Index of the configuration named for `platform`, else the last one
    pub fn index_for_platform(&self, platform: HostPlatform) -> usize {
        self.configurations
            .iter()
            .position(|c| c.name == platform.config_name())
            .unwrap_or_else(|| self.configurations.len().saturating_sub(1))
    }
}

/// One-shot bundle from the compiler-detection collaborator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerDefaults {
    pub compiler_path: Option<String>,
    pub c_standard: Option<String>,
    pub cpp_standard: Option<String>,
    pub includes: Vec<String>,
    pub frameworks: Vec<String>,
    pub windows_sdk_version: Option<String>,
    pub intelli_sense_mode: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedBrowse {
    pub path: Option<Vec<String>>,
    pub limit_symbols_to_included_headers: Option<bool>,
    pub database_filename: Option<String>,
}

/// Effective configuration handed to the language-analysis backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConfiguration {
    pub name: String,
    pub include_path: Option<Vec<String>>,
    pub defines: Option<Vec<String>>,
    pub mac_framework_path: Option<Vec<String>>,
    pub windows_sdk_version: Option<String>,
    pub compiler_path: Option<String>,
    pub c_standard: Option<String>,
    pub cpp_standard: Option<String>,
    pub intelli_sense_mode: Option<String>,
    pub compile_commands: Option<String>,
    pub forced_include: Option<Vec<String>>,
    pub configuration_provider: Option<String>,
    pub browse: ResolvedBrowse,
}

/// Convenience for building environments in tests and callers
pub fn environment<'a>(pairs: impl IntoIterator<Item = (&'a str, EnvValue)>) -> Environment {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

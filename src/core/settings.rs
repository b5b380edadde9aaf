//! Read-only typed view over editor-level `C_Cpp.default.*` settings
//!
//! Every accessor returns `None` when the setting is unset (absent or `null`). The only
//! mutation is [`CppSettings::update`], which changes the live in-memory layer and never
//! touches the settings file.

use crate::core::errors::{PropertiesError, PropertiesResult};
use crate::core::properties::loader::parse_jsonc;
use crate::core::variables::Environment;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Settings file inside the workspace folder's config directory
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Key holding extra variables for placeholder resolution
pub const ENV_SETTING_KEY: &str = "C_Cpp.env";

/// One defaultable configuration property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefaultProperty {
    IncludePath,
    Defines,
    MacFrameworkPath,
    WindowsSdkVersion,
    CompilerPath,
    CStandard,
    CppStandard,
    IntelliSenseMode,
    BrowsePath,
    LimitSymbolsToIncludedHeaders,
    DatabaseFilename,
    ForcedInclude,
    CompileCommands,
    ConfigurationProvider,
}

impl DefaultProperty {
    pub const ALL: [DefaultProperty; 14] = [
        Self::IncludePath,
        Self::Defines,
        Self::MacFrameworkPath,
        Self::WindowsSdkVersion,
        Self::CompilerPath,
        Self::CStandard,
        Self::CppStandard,
        Self::IntelliSenseMode,
        Self::BrowsePath,
        Self::LimitSymbolsToIncludedHeaders,
        Self::DatabaseFilename,
        Self::ForcedInclude,
        Self::CompileCommands,
        Self::ConfigurationProvider,
    ];

    /// Settings key as written in settings.json
    pub fn key(self) -> &'static str {
        match self {
            Self::IncludePath => "C_Cpp.default.includePath",
            Self::Defines => "C_Cpp.default.defines",
            Self::MacFrameworkPath => "C_Cpp.default.macFrameworkPath",
            Self::WindowsSdkVersion => "C_Cpp.default.windowsSdkVersion",
            Self::CompilerPath => "C_Cpp.default.compilerPath",
            Self::CStandard => "C_Cpp.default.cStandard",
            Self::CppStandard => "C_Cpp.default.cppStandard",
            Self::IntelliSenseMode => "C_Cpp.default.intelliSenseMode",
            Self::BrowsePath => "C_Cpp.default.browse.path",
            Self::LimitSymbolsToIncludedHeaders => {
                "C_Cpp.default.browse.limitSymbolsToIncludedHeaders"
            }
            Self::DatabaseFilename => "C_Cpp.default.browse.databaseFilename",
            Self::ForcedInclude => "C_Cpp.default.forcedInclude",
            Self::CompileCommands => "C_Cpp.default.compileCommands",
            Self::ConfigurationProvider => "C_Cpp.default.configurationProvider",
        }
    }
}

/// Editor-level settings for one workspace folder
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CppSettings {
    values: Map<String, Value>,
}

impl CppSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a settings object; non-object values yield empty settings
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(values) => Self { values },
            other => {
                warn!("Ignoring non-object settings value: {}", other);
                Self::default()
            }
        }
    }

    /// Location of the folder's settings file
    pub fn settings_path(folder: &Path) -> PathBuf {
        folder.join(".vscode").join(SETTINGS_FILE_NAME)
    }

    /// Load `<folder>/.vscode/settings.json`; a missing file means no settings
    pub fn load(folder: &Path) -> PropertiesResult<Self> {
        let path = Self::settings_path(folder);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No settings file at {}", path.display());
                return Ok(Self::default());
            }
            Err(source) => return Err(PropertiesError::Read { path, source }),
        };

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let value = parse_jsonc(&content).map_err(|message| PropertiesError::Settings {
            path: path.clone(),
            message,
        })?;
        debug!("Loaded settings from {}", path.display());
        Ok(Self::from_value(value))
    }

    /// Builder-style setter, mostly for tests and embedding hosts
    pub fn with(mut self, property: DefaultProperty, value: Value) -> Self {
        self.update(property, Some(value));
        self
    }

    /// Builder-style setter for the env setting
    pub fn with_env(mut self, env: Value) -> Self {
        self.values.insert(ENV_SETTING_KEY.to_string(), env);
        self
    }

    /// Persist a value into the live layer, or clear it with `None`
    pub fn update(&mut self, property: DefaultProperty, value: Option<Value>) {
        match value {
            Some(value) => {
                debug!("Setting {} = {}", property.key(), value);
                self.values.insert(property.key().to_string(), value);
            }
            None => {
                debug!("Clearing setting {}", property.key());
                self.values.remove(property.key());
            }
        }
    }

    fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.values.get(key)?;
        if value.is_null() {
            return None;
        }
        match serde_json::from_value(value.clone()) {
            Ok(typed) => Some(typed),
            Err(e) => {
                warn!("Ignoring setting {} with unexpected type: {}", key, e);
                None
            }
        }
    }

    pub fn is_unset(&self, property: DefaultProperty) -> bool {
        self.values.get(property.key()).map_or(true, Value::is_null)
    }

    pub fn default_include_path(&self) -> Option<Vec<String>> {
        self.get(DefaultProperty::IncludePath.key())
    }

    pub fn default_defines(&self) -> Option<Vec<String>> {
        self.get(DefaultProperty::Defines.key())
    }

    pub fn default_mac_framework_path(&self) -> Option<Vec<String>> {
        self.get(DefaultProperty::MacFrameworkPath.key())
    }

    pub fn default_windows_sdk_version(&self) -> Option<String> {
        self.get(DefaultProperty::WindowsSdkVersion.key())
    }

    pub fn default_compiler_path(&self) -> Option<String> {
        self.get(DefaultProperty::CompilerPath.key())
    }

    pub fn default_c_standard(&self) -> Option<String> {
        self.get(DefaultProperty::CStandard.key())
    }

    pub fn default_cpp_standard(&self) -> Option<String> {
        self.get(DefaultProperty::CppStandard.key())
    }

    pub fn default_intelli_sense_mode(&self) -> Option<String> {
        self.get(DefaultProperty::IntelliSenseMode.key())
    }

    pub fn default_browse_path(&self) -> Option<Vec<String>> {
        self.get(DefaultProperty::BrowsePath.key())
    }

    pub fn default_limit_symbols_to_included_headers(&self) -> Option<bool> {
        self.get(DefaultProperty::LimitSymbolsToIncludedHeaders.key())
    }

    pub fn default_database_filename(&self) -> Option<String> {
        self.get(DefaultProperty::DatabaseFilename.key())
    }

    pub fn default_forced_include(&self) -> Option<Vec<String>> {
        self.get(DefaultProperty::ForcedInclude.key())
    }

    pub fn default_compile_commands(&self) -> Option<String> {
        self.get(DefaultProperty::CompileCommands.key())
    }

    pub fn default_configuration_provider(&self) -> Option<String> {
        self.get(DefaultProperty::ConfigurationProvider.key())
    }

    /// Extra variables contributed by settings
    pub fn env(&self) -> Option<Environment> {
        self.get(ENV_SETTING_KEY)
    }
}

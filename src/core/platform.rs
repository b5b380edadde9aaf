//! Host platform tag and the defaults derived from it

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved configuration names, one per host platform
pub const LINUX_CONFIG_NAME: &str = "Linux";
pub const MAC_CONFIG_NAME: &str = "Mac";
pub const WIN32_CONFIG_NAME: &str = "Win32";

/// The platform the engine is running on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostPlatform {
    Linux,
    Mac,
    Windows,
}

impl HostPlatform {
    /// Detect the platform this binary was compiled for
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::Mac
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::Linux
        }
    }

    /// Name of the configuration synthesized for this platform
    pub fn config_name(self) -> &'static str {
        match self {
            Self::Linux => LINUX_CONFIG_NAME,
            Self::Mac => MAC_CONFIG_NAME,
            Self::Windows => WIN32_CONFIG_NAME,
        }
    }

    /// IntelliSense mode used when a configuration name gives no hint
    pub fn default_intelli_sense_mode(self) -> &'static str {
        match self {
            Self::Linux => "gcc-x64",
            Self::Mac => "clang-x64",
            Self::Windows => "msvc-x64",
        }
    }

    /// IntelliSense mode for a named configuration.
    ///
    /// The three reserved names map to their own toolchain regardless of the host.
    pub fn intelli_sense_mode_for(self, config_name: &str) -> &'static str {
        match config_name {
            LINUX_CONFIG_NAME => "gcc-x64",
            MAC_CONFIG_NAME => "clang-x64",
            WIN32_CONFIG_NAME => "msvc-x64",
            _ => self.default_intelli_sense_mode(),
        }
    }

    pub fn is_reserved_config_name(name: &str) -> bool {
        matches!(name, LINUX_CONFIG_NAME | MAC_CONFIG_NAME | WIN32_CONFIG_NAME)
    }
}

impl Default for HostPlatform {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_name())
    }
}

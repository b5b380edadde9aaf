//! Schema migration chain for c_cpp_properties.json
//!
//! Each step only fills fields that are still unset, so re-running the chain over an already
//! migrated document changes nothing.

use super::types::{CompilerDefaults, ConfigurationDocument, Setting, CURRENT_VERSION};
use crate::core::platform::{HostPlatform, MAC_CONFIG_NAME};
use crate::core::settings::CppSettings;
use tracing::{debug, warn};

/// Framework search paths injected into Mac configurations at version 3
pub const MAC_FRAMEWORK_PATHS: [&str; 2] = ["/System/Library/Frameworks", "/Library/Frameworks"];

/// Inputs a migration step may consult
pub struct MigrationContext<'a> {
    pub platform: HostPlatform,
    pub settings: &'a CppSettings,
    pub compiler_defaults: Option<&'a CompilerDefaults>,
}

/// What a migration run did to the document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationOutcome {
    /// The document differs from what was read and must be written back
    pub changed: bool,
    /// Version found on disk that this engine does not know
    pub unknown_version: Option<i64>,
}

/// Legacy documents carry no version; the bump itself is the whole step
pub fn to_version_2(document: &mut ConfigurationDocument) {
    document.version = Some(2);
}

pub fn to_version_3(document: &mut ConfigurationDocument, ctx: &MigrationContext<'_>) {
    document.version = Some(3);
    for config in &mut document.configurations {
        let targets_mac = config.name == MAC_CONFIG_NAME
            || (ctx.platform == HostPlatform::Mac
                && !HostPlatform::is_reserved_config_name(&config.name));
        if targets_mac && config.mac_framework_path.is_unset() {
            debug!("Adding default framework paths to '{}'", config.name);
            config.mac_framework_path = Setting::Value(
                MAC_FRAMEWORK_PATHS.iter().map(|p| p.to_string()).collect(),
            );
        }
    }
}

pub fn to_version_4(document: &mut ConfigurationDocument, ctx: &MigrationContext<'_>) {
    document.version = Some(4);
    let settings = ctx.settings;
    let defaults = ctx.compiler_defaults;

    for config in &mut document.configurations {
        if config.intelli_sense_mode.is_unset() && settings.default_intelli_sense_mode().is_none() {
            config.intelli_sense_mode = Setting::Value(
                ctx.platform.intelli_sense_mode_for(&config.name).to_string(),
            );
        }

        let compiler_path = defaults.and_then(|d| d.compiler_path.clone());
        if config.compiler_path.is_unset()
            && config.compile_commands.is_unset()
            && settings.default_compiler_path().is_none()
        {
            if let Some(path) = compiler_path {
                config.compiler_path = Setting::Value(path);
            }
        }

        let c_standard = defaults.and_then(|d| d.c_standard.clone());
        if config.c_standard.is_unset() && settings.default_c_standard().is_none() {
            if let Some(standard) = c_standard {
                config.c_standard = Setting::Value(standard);
            }
        }

        let cpp_standard = defaults.and_then(|d| d.cpp_standard.clone());
        if config.cpp_standard.is_unset() && settings.default_cpp_standard().is_none() {
            if let Some(standard) = cpp_standard {
                config.cpp_standard = Setting::Value(standard);
            }
        }
    }
}

/// Bring `document` up to [`CURRENT_VERSION`]
pub fn migrate(document: &mut ConfigurationDocument, ctx: &MigrationContext<'_>) -> MigrationOutcome {
    let mut outcome = MigrationOutcome::default();
    match document.version {
        Some(CURRENT_VERSION) => return outcome,
        None => {
            to_version_2(document);
            to_version_3(document, ctx);
            to_version_4(document, ctx);
        }
        Some(2) => {
            to_version_3(document, ctx);
            to_version_4(document, ctx);
        }
        Some(3) => to_version_4(document, ctx),
        Some(other) => {
            warn!(
                "Unknown c_cpp_properties.json version {}; treating as version {}",
                other, CURRENT_VERSION
            );
            document.version = Some(CURRENT_VERSION);
            outcome.unknown_version = Some(other);
        }
    }
    outcome.changed = true;
    outcome
}

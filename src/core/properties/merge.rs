//! Per-property merge of document values with settings-level defaults
//!
//! Each property kind has its own merge function. Which one applies is decided by the field's
//! type in [`Configuration`], never by inspecting values at runtime.

use super::types::{Configuration, ResolvedBrowse, ResolvedConfiguration, Setting};
use crate::core::settings::CppSettings;
use crate::core::variables::{resolve_and_split, resolve_variables, EnvValue, Environment};
use once_cell::sync::Lazy;
use regex::Regex;

static ROOT_TOKEN_ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\$\{(workspaceRoot|workspaceFolder)\}(\\\*{0,2}|/\*{0,2})?$")
        .expect("root token pattern is a valid regex")
});

static ROOT_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\\\*{0,2}|/\*{0,2})?$").expect("root suffix pattern is a valid regex"));

/// Scalar string property: unset or defaulted values take the settings default, then resolve
pub fn merge_string(
    value: &Setting<String>,
    default: Option<String>,
    env: &Environment,
) -> Option<String> {
    let chosen = match value {
        Setting::Value(value) => Some(value.clone()),
        Setting::Unset | Setting::UseDefault => default,
    };
    chosen.map(|value| resolve_variables(&value, env))
}

/// Boolean property: unset or defaulted values take the settings default
pub fn merge_bool(value: &Setting<bool>, default: Option<bool>) -> Option<bool> {
    match value {
        Setting::Value(value) => Some(*value),
        Setting::Unset | Setting::UseDefault => default,
    }
}

/// List property: entries resolve in order with `${default}` spliced in place; an absent list
/// inherits the settings default wholesale
pub fn merge_list(
    value: &Setting<Vec<String>>,
    default: Option<Vec<String>>,
    env: &Environment,
) -> Option<Vec<String>> {
    match value {
        Setting::Value(entries) => Some(resolve_and_split(entries, default.as_deref(), env)),
        Setting::Unset | Setting::UseDefault => {
            default.map(|entries| resolve_and_split(&entries, None, env))
        }
    }
}

/// True if `entry` names the workspace folder itself, optionally with a `/`, `/*` or `/**` suffix
pub fn is_workspace_root_entry(entry: &str, workspace_root: &str) -> bool {
    if ROOT_TOKEN_ENTRY.is_match(entry) {
        return true;
    }
    if workspace_root.is_empty() {
        return false;
    }
    entry
        .strip_prefix(workspace_root)
        .is_some_and(|rest| ROOT_SUFFIX.is_match(rest))
}

/// Inputs shared by every configuration resolved in one reconciliation
pub struct MergeContext<'a> {
    pub settings: &'a CppSettings,
    pub env: &'a Environment,
    /// Resolved workspace folder path
    pub workspace_root: &'a str,
}

impl MergeContext<'_> {
    /// Derive the effective configuration for `config`
    pub fn resolve(&self, config: &Configuration) -> ResolvedConfiguration {
        let settings = self.settings;
        let env = self.env;

        let include_path = merge_list(&config.include_path, settings.default_include_path(), env);

        let browse = config.browse.clone().unwrap_or_default();
        let browse_path = match browse.path {
            Setting::Value(_) => merge_list(&browse.path, settings.default_browse_path(), env),
            Setting::Unset | Setting::UseDefault => self.synthesize_browse_path(&include_path),
        };

        ResolvedConfiguration {
            name: config.name.clone(),
            defines: merge_list(&config.defines, settings.default_defines(), env),
            mac_framework_path: merge_list(
                &config.mac_framework_path,
                settings.default_mac_framework_path(),
                env,
            ),
            windows_sdk_version: merge_string(
                &config.windows_sdk_version,
                settings.default_windows_sdk_version(),
                env,
            ),
            forced_include: merge_list(
                &config.forced_include,
                settings.default_forced_include(),
                env,
            ),
            compile_commands: merge_string(
                &config.compile_commands,
                settings.default_compile_commands(),
                env,
            ),
            compiler_path: merge_string(
                &config.compiler_path,
                settings.default_compiler_path(),
                env,
            ),
            c_standard: merge_string(&config.c_standard, settings.default_c_standard(), env),
            cpp_standard: merge_string(&config.cpp_standard, settings.default_cpp_standard(), env),
            intelli_sense_mode: merge_string(
                &config.intelli_sense_mode,
                settings.default_intelli_sense_mode(),
                env,
            ),
            configuration_provider: merge_string(
                &config.configuration_provider,
                settings.default_configuration_provider(),
                env,
            ),
            browse: ResolvedBrowse {
                path: browse_path,
                limit_symbols_to_included_headers: merge_bool(
                    &browse.limit_symbols_to_included_headers,
                    settings.default_limit_symbols_to_included_headers(),
                ),
                database_filename: merge_string(
                    &browse.database_filename,
                    settings.default_database_filename(),
                    env,
                ),
            },
            include_path,
        }
    }

    fn synthesize_browse_path(&self, include_path: &Option<Vec<String>>) -> Option<Vec<String>> {
        if let Some(default) = self.settings.default_browse_path() {
            return Some(resolve_and_split(&default, None, self.env));
        }

        let mut path = include_path.clone()?;
        if !path
            .iter()
            .any(|entry| is_workspace_root_entry(entry, self.workspace_root))
        {
            let root = if self.workspace_root.is_empty() {
                "${workspaceFolder}".to_string()
            } else {
                self.workspace_root.to_string()
            };
            path.push(root);
        }
        Some(path)
    }
}

/// Layers making up the variable environment, lowest precedence first
pub struct EnvironmentLayers<'a> {
    pub process: Vec<(String, String)>,
    pub vcpkg_root: Option<&'a str>,
    pub settings: Option<Environment>,
    pub document: Option<&'a Environment>,
    pub workspace_root: &'a str,
    pub workspace_basename: &'a str,
}

impl EnvironmentLayers<'_> {
    /// Flatten the layers; reserved workspace keys always win
    pub fn build(self) -> Environment {
        let mut env: Environment = self
            .process
            .into_iter()
            .map(|(key, value)| (key, EnvValue::Single(value)))
            .collect();

        if let Some(root) = self.vcpkg_root {
            env.insert("vcpkgRoot".to_string(), EnvValue::from(root));
        }
        if let Some(settings) = self.settings {
            env.extend(settings);
        }
        if let Some(document) = self.document {
            env.extend(document.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        env.shift_remove("default");
        env.insert(
            "workspaceFolder".to_string(),
            EnvValue::from(self.workspace_root),
        );
        env.insert("workspaceRoot".to_string(), EnvValue::from(self.workspace_root));
        env.insert(
            "workspaceFolderBasename".to_string(),
            EnvValue::from(self.workspace_basename),
        );
        env
    }
}

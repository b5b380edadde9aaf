//! Configuration store for one workspace folder
//!
//! The store owns the parsed (or synthesized) document and the selected index, and derives the
//! resolved configurations from the document, the editor settings, the detected compiler
//! defaults and the include scan. Every mutating entry point ends in a reconciliation that
//! re-resolves all configurations and, once defaulting is complete, broadcasts them.
//!
//! All methods take `&mut self`; callers deliver events one at a time.

use super::folder_state::FolderState;
use super::include_scan::IncludeScan;
use super::loader::{self, config_folder, properties_path};
use super::merge::{EnvironmentLayers, MergeContext};
use super::migration::{self, MigrationContext};
use super::types::{
    CompilerDefaults, Configuration, ConfigurationDocument, ResolvedConfiguration, Setting,
    DEFAULT_INCLUDE_ROOT,
};
use crate::core::errors::{PropertiesError, PropertiesResult};
use crate::core::platform::HostPlatform;
use crate::core::providers::ProviderRegistry;
use crate::core::settings::{CppSettings, DefaultProperty};
use crate::core::variables::DEFAULT_TOKEN;
use crate::core::watchers::{
    CompileCommandsWatch, MessageLevel, PropertiesEvent, PropertiesNotifier,
};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};

const UNKNOWN_VERSION_MESSAGE: &str =
    "Unknown version number found in c_cpp_properties.json. Some features may not work as expected.";

/// Presents the properties file to the user
pub trait DocumentHost: Send {
    fn show_document(&mut self, path: &Path);
}

/// Host without an editor: showing a document only logs it
#[derive(Debug, Default)]
pub struct LogDocumentHost;

impl DocumentHost for LogDocumentHost {
    fn show_document(&mut self, path: &Path) {
        info!("Edit configurations in {}", path.display());
    }
}

/// Construction options for [`CppProperties`]
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub platform: HostPlatform,
    /// Hold the defaulting pass until [`CppProperties::set_include_scan_result`] is called
    pub await_include_scan: bool,
    /// Where the selected index is persisted; `None` keeps it in memory
    pub state_file: Option<PathBuf>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            platform: HostPlatform::current(),
            await_include_scan: false,
            state_file: None,
        }
    }
}

pub struct CppProperties {
    root: PathBuf,
    config_folder: PathBuf,
    /// Set while c_cpp_properties.json exists on disk
    properties_file: Option<PathBuf>,
    document: ConfigurationDocument,
    resolved: Vec<ResolvedConfiguration>,
    current_index: Option<usize>,
    folder_state: FolderState,
    /// Compiler-detected defaults have not been merged into this document yet
    configuration_incomplete: bool,
    compiler_defaults: Option<CompilerDefaults>,
    include_scan: Option<IncludeScan>,
    settings: CppSettings,
    registry: Arc<ProviderRegistry>,
    platform: HostPlatform,
    notifier: PropertiesNotifier,
    compile_commands_watch: Option<Box<dyn CompileCommandsWatch>>,
    compile_commands_files: BTreeSet<PathBuf>,
    document_host: Box<dyn DocumentHost>,
    /// mtime of the file as last read or written, compared by the fallback poll
    last_seen_mtime: Option<SystemTime>,
}

impl CppProperties {
    /// Create the store and run the first reconciliation.
    ///
    /// A properties file that fails to parse does not fail construction: the error is surfaced
    /// through `notifier` and the store keeps the platform defaults.
    pub fn new(
        root: impl Into<PathBuf>,
        settings: CppSettings,
        registry: Arc<ProviderRegistry>,
        notifier: PropertiesNotifier,
        options: StoreOptions,
    ) -> Self {
        let root = root.into();
        let folder_state = match options.state_file {
            Some(state_file) => FolderState::load(state_file, &root),
            None => FolderState::in_memory(&root),
        };
        let path = properties_path(&root);
        let properties_file = path.is_file().then_some(path);
        let platform = options.platform;

        let mut store = Self {
            config_folder: config_folder(&root),
            current_index: folder_state.current_index(),
            root,
            properties_file,
            document: ConfigurationDocument::platform_default(platform),
            resolved: Vec::new(),
            folder_state,
            configuration_incomplete: true,
            compiler_defaults: None,
            include_scan: (!options.await_include_scan).then(IncludeScan::default),
            settings,
            registry,
            platform,
            notifier,
            compile_commands_watch: None,
            compile_commands_files: BTreeSet::new(),
            document_host: Box::new(LogDocumentHost),
            last_seen_mtime: None,
        };

        // A persisted index is checked against the parsed file, not the synthesized default
        if store.current_index.is_none() || store.properties_file.is_none() {
            let reset_index = store.current_index.is_none();
            store.reset_to_default_settings(reset_index);
        }
        if let Err(e) = store.handle_configuration_change() {
            warn!("Initial load of {} failed: {}", store.root.display(), e);
        }
        store
    }

    pub fn with_document_host(mut self, host: Box<dyn DocumentHost>) -> Self {
        self.document_host = host;
        self
    }

    /// Install the compile-commands watcher and point it at the current file set
    pub fn with_compile_commands_watch(mut self, mut watch: Box<dyn CompileCommandsWatch>) -> Self {
        watch.rebuild(&self.compile_commands_files);
        self.compile_commands_watch = Some(watch);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_folder(&self) -> &Path {
        &self.config_folder
    }

    pub fn properties_file(&self) -> Option<&Path> {
        self.properties_file.as_deref()
    }

    pub fn document(&self) -> &ConfigurationDocument {
        &self.document
    }

    pub fn resolved(&self) -> &[ResolvedConfiguration] {
        &self.resolved
    }

    pub fn settings(&self) -> &CppSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn platform(&self) -> HostPlatform {
        self.platform
    }

    /// True once compiler defaults have been merged or a file was parsed
    pub fn is_complete(&self) -> bool {
        !self.configuration_incomplete
    }

    pub fn current_index(&self) -> usize {
        self.current_index.unwrap_or(0)
    }

    pub fn current_configuration(&self) -> Option<&Configuration> {
        self.document.configurations.get(self.current_index())
    }

    pub fn current_resolved(&self) -> Option<&ResolvedConfiguration> {
        self.resolved.get(self.current_index())
    }

    /// Compile-commands files currently watched
    pub fn compile_commands_files(&self) -> &BTreeSet<PathBuf> {
        &self.compile_commands_files
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<PropertiesEvent> {
        self.notifier.subscribe()
    }

    fn set_current_index(&mut self, index: usize) {
        self.current_index = Some(index);
        if let Err(e) = self.folder_state.set_current_index(index) {
            warn!("Failed to persist configuration index: {}", e);
        }
    }

    fn index_in_range(&self) -> bool {
        self.current_index
            .is_some_and(|index| index < self.document.configurations.len())
    }

    fn normalize_index(&mut self) {
        if !self.index_in_range() {
            let index = self.document.index_for_platform(self.platform);
            debug!("Configuration index reset to {}", index);
            self.set_current_index(index);
        }
    }

    /// Replace the document with the platform default; the defaulting pass runs again
    pub fn reset_to_default_settings(&mut self, reset_index: bool) {
        self.document = ConfigurationDocument::platform_default(self.platform);
        if reset_index || !self.index_in_range() {
            let index = self.document.index_for_platform(self.platform);
            self.set_current_index(index);
        }
        self.configuration_incomplete = true;
    }

    /// Full reconciliation: re-parse if a file exists, default, resolve and notify.
    ///
    /// A parse failure is returned after the rest of the reconciliation has run against the
    /// retained document.
    pub fn handle_configuration_change(&mut self) -> PropertiesResult<()> {
        self.remember_mtime();
        let parsed = self.parse_properties_file();
        self.reconcile_in_memory();
        parsed.map(|_| ())
    }

    /// Reconcile the document as it is in memory, without reading the file
    fn reconcile_in_memory(&mut self) {
        self.normalize_index();
        self.apply_default_include_paths_and_frameworks();
        self.update_server_on_folder_settings_change();
    }

    fn remember_mtime(&mut self) {
        self.last_seen_mtime = self.properties_file.as_deref().and_then(file_mtime);
    }

    /// Re-read c_cpp_properties.json into the store.
    ///
    /// Returns `Ok(false)` when there is no file or it is still empty. On failure the previous
    /// document is kept and the error is surfaced before being returned.
    pub fn parse_properties_file(&mut self) -> PropertiesResult<bool> {
        let Some(path) = self.properties_file.clone() else {
            return Ok(false);
        };

        let document = match loader::read_document(&path) {
            Ok(Some(document)) => document,
            Ok(None) => {
                debug!("Skipping empty {}", path.display());
                return Ok(false);
            }
            Err(e) => {
                self.notifier.report(&e);
                return Err(e);
            }
        };

        // Follow the selected configuration by name across edits
        let selected_name = if self.configuration_incomplete {
            None
        } else {
            self.current_index
                .and_then(|index| self.document.configurations.get(index))
                .map(|config| config.name.clone())
        };
        self.document = document;
        if let Some(name) = selected_name {
            if let Some(index) = self
                .document
                .configurations
                .iter()
                .position(|config| config.name == name)
            {
                self.set_current_index(index);
            }
        }
        self.normalize_index();

        let mut dirty = false;
        for config in &mut self.document.configurations {
            if let Setting::Value(id) = &config.configuration_provider {
                let checked = self.registry.check_id(id);
                if checked != *id {
                    info!("Updating configuration provider '{}' to '{}'", id, checked);
                    config.configuration_provider = Setting::Value(checked);
                    dirty = true;
                }
            }
        }

        let stripped = self.document.strip_reserved_env();
        if stripped > 0 {
            debug!("Removed {} reserved env key(s) from {}", stripped, path.display());
        }

        self.configuration_incomplete = false;

        let ctx = MigrationContext {
            platform: self.platform,
            settings: &self.settings,
            compiler_defaults: self.compiler_defaults.as_ref(),
        };
        let outcome = migration::migrate(&mut self.document, &ctx);
        if let Some(version) = outcome.unknown_version {
            debug!("Coerced unknown version {}", version);
            self.notifier.message(MessageLevel::Warning, UNKNOWN_VERSION_MESSAGE);
        }

        if dirty || outcome.changed {
            self.write_properties_file();
        }
        debug!(
            "Parsed {} configuration(s) from {}",
            self.document.configurations.len(),
            path.display()
        );
        Ok(true)
    }

    /// Write the in-memory document; a failure is surfaced as a warning and returns false
    fn write_properties_file(&mut self) -> bool {
        let Some(path) = self.properties_file.as_deref() else {
            return false;
        };
        match loader::write_document(path, &self.document) {
            Ok(()) => {
                self.remember_mtime();
                true
            }
            Err(e) => {
                self.notifier.report(&e);
                false
            }
        }
    }

    /// Merge compiler-detected values into the current configuration, once per document.
    ///
    /// Waits until the document is incomplete, compiler defaults have arrived and the include
    /// scan has finished. Returns true if the pass ran.
    pub fn apply_default_include_paths_and_frameworks(&mut self) -> bool {
        if !self.configuration_incomplete {
            return false;
        }
        let (Some(defaults), Some(scan)) = (&self.compiler_defaults, &self.include_scan) else {
            return false;
        };

        let index = self.current_index();
        let Some(config) = self.document.configurations.get_mut(index) else {
            return false;
        };
        apply_default_configuration_values(config, &self.settings, defaults, scan, self.platform);
        self.configuration_incomplete = false;
        info!("Applied compiler defaults to '{}'", config.name);
        true
    }

    /// Extended environment used for placeholder resolution
    pub fn extended_environment(&self) -> crate::core::variables::Environment {
        let root = self.root.to_string_lossy();
        let basename = self
            .root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let vcpkg_root = self.include_scan.as_ref().and_then(IncludeScan::vcpkg_root_str);

        EnvironmentLayers {
            process: std::env::vars_os()
                .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
                .collect(),
            vcpkg_root: vcpkg_root.as_deref(),
            settings: self.settings.env(),
            document: self.document.env.as_ref(),
            workspace_root: &root,
            workspace_basename: &basename,
        }
        .build()
    }

    /// Re-resolve every configuration, rebuild compile-commands watches and notify
    pub fn update_server_on_folder_settings_change(&mut self) {
        let env = self.extended_environment();
        let root = self.root.to_string_lossy().into_owned();
        let ctx = MergeContext {
            settings: &self.settings,
            env: &env,
            workspace_root: &root,
        };
        self.resolved = self
            .document
            .configurations
            .iter()
            .map(|config| ctx.resolve(config))
            .collect();

        self.update_compile_commands_file_watchers();

        if self.configuration_incomplete {
            debug!("Defaulting incomplete; configurations not published");
        } else {
            self.notifier
                .notify(PropertiesEvent::ConfigurationsChanged(self.resolved.clone()));
        }
    }

    fn update_compile_commands_file_watchers(&mut self) {
        let files: BTreeSet<PathBuf> = self
            .resolved
            .iter()
            .filter_map(|config| config.compile_commands.as_deref())
            .map(|path| self.root.join(path))
            .filter(|path| path.is_file())
            .collect();

        if let Some(watch) = self.compile_commands_watch.as_mut() {
            watch.rebuild(&files);
        }
        self.compile_commands_files = files;
    }

    pub fn on_properties_file_created(&mut self) -> PropertiesResult<()> {
        self.properties_file = Some(properties_path(&self.root));
        self.handle_configuration_change()
    }

    pub fn on_properties_file_changed(&mut self) -> PropertiesResult<()> {
        if self.properties_file.is_none() {
            return self.on_properties_file_created();
        }
        self.handle_configuration_change()
    }

    pub fn on_properties_file_deleted(&mut self) -> PropertiesResult<()> {
        info!("{} removed; using defaults", properties_path(&self.root).display());
        self.properties_file = None;
        self.reset_to_default_settings(true);
        self.handle_configuration_change()
    }

    pub fn on_compile_commands_changed(&self, path: PathBuf) {
        debug!("Compile commands changed: {}", path.display());
        self.notifier
            .notify(PropertiesEvent::CompileCommandsChanged(path));
    }

    /// Record the compiler-detection bundle; later bundles are ignored
    pub fn set_compiler_defaults(&mut self, defaults: CompilerDefaults) -> PropertiesResult<()> {
        if self.compiler_defaults.is_some() {
            debug!("Compiler defaults already recorded");
            return Ok(());
        }
        self.compiler_defaults = Some(defaults);
        self.handle_configuration_change()
    }

    /// Record the finished include scan; later results are ignored
    pub fn set_include_scan_result(&mut self, scan: IncludeScan) -> PropertiesResult<()> {
        if self.include_scan.is_some() {
            debug!("Include scan already finished");
            return Ok(());
        }
        self.include_scan = Some(scan);
        self.handle_configuration_change()
    }

    /// React to new editor settings
    pub fn on_did_change_settings(&mut self, settings: CppSettings) -> PropertiesResult<()> {
        self.settings = settings;
        self.reconcile_settings()
    }

    /// Re-read settings.json; an invalid file keeps the previous settings
    pub fn reload_settings(&mut self) -> PropertiesResult<()> {
        match CppSettings::load(&self.root) {
            Ok(settings) => self.on_did_change_settings(settings),
            Err(e) => {
                self.notifier.report(&e);
                Err(e)
            }
        }
    }

    fn reconcile_settings(&mut self) -> PropertiesResult<()> {
        if self.properties_file.is_none() {
            self.reset_to_default_settings(true);
            self.handle_configuration_change()
        } else if self.configuration_incomplete {
            debug!("Settings changed before defaulting completed; waiting");
            Ok(())
        } else {
            self.handle_configuration_change()
        }
    }

    /// Make sure c_cpp_properties.json exists, creating it from defaults if needed, and
    /// optionally show it to the user
    pub fn handle_configuration_edit_command(&mut self, show: bool) -> PropertiesResult<()> {
        let path = properties_path(&self.root);
        if self.properties_file.is_none() || !path.is_file() {
            fs::create_dir_all(&self.config_folder).map_err(|source| PropertiesError::Write {
                path: self.config_folder.clone(),
                source,
            })?;

            self.reset_to_default_settings(true);
            self.apply_default_include_paths_and_frameworks();
            if let Some(provider) = self.settings.default_configuration_provider() {
                for config in &mut self.document.configurations {
                    config.configuration_provider = Setting::Value(provider.clone());
                }
                self.settings
                    .update(DefaultProperty::ConfigurationProvider, None);
            }

            if let Err(e) = loader::write_document(&path, &self.document) {
                self.notifier.report(&e);
                return Err(e);
            }
            info!("Created {}", path.display());
            self.properties_file = Some(path.clone());
            self.remember_mtime();
        }

        if show {
            self.document_host.show_document(&path);
        }
        Ok(())
    }

    /// Discard in-memory edits by re-reading the file, then apply `edit` to the current
    /// configuration, write and reconcile
    fn edit_current_configuration(
        &mut self,
        edit: impl FnOnce(&mut Configuration),
    ) -> PropertiesResult<()> {
        self.handle_configuration_edit_command(false)?;
        self.parse_properties_file()?;

        let index = self.current_index();
        match self.document.configurations.get_mut(index) {
            Some(config) => edit(config),
            None => warn!("No configuration at index {}", index),
        }
        self.commit_edit()
    }

    /// Persist an in-memory edit and reconcile.
    ///
    /// When the write fails the edit stays in memory and is resolved from there; the file on
    /// disk is not read back over it.
    fn commit_edit(&mut self) -> PropertiesResult<()> {
        if self.write_properties_file() {
            self.handle_configuration_change()
        } else {
            warn!("Keeping unsaved edit to {}", self.root.display());
            self.reconcile_in_memory();
            Ok(())
        }
    }

    /// Append `path` to the current configuration's include path
    pub fn add_to_include_path(&mut self, path: &str) -> PropertiesResult<()> {
        let path = path.to_string();
        self.edit_current_configuration(move |config| match &mut config.include_path {
            Setting::Value(entries) => entries.push(path),
            Setting::Unset | Setting::UseDefault => {
                config.include_path = Setting::Value(vec![DEFAULT_TOKEN.to_string(), path]);
            }
        })
    }

    pub fn set_compile_commands(&mut self, path: &str) -> PropertiesResult<()> {
        let path = path.to_string();
        self.edit_current_configuration(move |config| {
            config.compile_commands = Setting::Value(path);
        })
    }

    /// Set or clear the current configuration's provider.
    ///
    /// Without a properties file the value goes into the live settings layer and no file is
    /// created.
    pub fn update_custom_configuration_provider(
        &mut self,
        provider_id: Option<&str>,
    ) -> PropertiesResult<()> {
        let provider_id = provider_id.filter(|id| !id.is_empty()).map(str::to_string);

        if self.properties_file.is_some() {
            return self.edit_current_configuration(move |config| {
                config.configuration_provider = provider_id.into();
            });
        }

        self.settings.update(
            DefaultProperty::ConfigurationProvider,
            provider_id.map(serde_json::Value::String),
        );
        self.reconcile_settings()
    }

    /// Select a configuration; `index == len` opens the file for editing instead
    pub fn select(&mut self, index: usize) -> PropertiesResult<()> {
        if index == self.document.configurations.len() {
            return self.handle_configuration_edit_command(true);
        }
        self.set_current_index(index);
        info!("Selected configuration {}", index);
        self.notifier.notify(PropertiesEvent::SelectionChanged(index));
        Ok(())
    }

    /// Fallback poll for missed watcher events
    pub fn check_cpp_properties(&mut self) -> PropertiesResult<()> {
        let path = properties_path(&self.root);
        match fs::metadata(&path) {
            Err(_) => {
                if self.properties_file.is_some() {
                    self.on_properties_file_deleted()
                } else {
                    Ok(())
                }
            }
            Ok(metadata) => {
                let unchanged = metadata.modified().ok() == self.last_seen_mtime;
                if self.properties_file.is_some() && unchanged {
                    return Ok(());
                }
                debug!("{} changed without a watch event", path.display());
                if self.properties_file.is_none() {
                    self.properties_file = Some(path);
                }
                self.handle_configuration_change()
            }
        }
    }
}

impl std::fmt::Debug for CppProperties {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CppProperties")
            .field("root", &self.root)
            .field("properties_file", &self.properties_file)
            .field("current_index", &self.current_index)
            .field("configuration_incomplete", &self.configuration_incomplete)
            .field("configurations", &self.document.configurations.len())
            .finish()
    }
}

fn file_mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|metadata| metadata.modified()).ok()
}

/// Fill the current configuration from compiler defaults wherever no settings default exists
fn apply_default_configuration_values(
    config: &mut Configuration,
    settings: &CppSettings,
    defaults: &CompilerDefaults,
    scan: &IncludeScan,
    platform: HostPlatform,
) {
    if settings.is_unset(DefaultProperty::IncludePath) {
        let mut include_path = vec![DEFAULT_INCLUDE_ROOT.to_string()];
        for entry in defaults.includes.iter().chain(&scan.includes) {
            if !include_path.contains(entry) {
                include_path.push(entry.clone());
            }
        }
        config.include_path = Setting::Value(include_path);
    }

    if settings.is_unset(DefaultProperty::Defines) {
        config.defines = Setting::Value(if platform == HostPlatform::Windows {
            vec![
                "_DEBUG".to_string(),
                "UNICODE".to_string(),
                "_UNICODE".to_string(),
            ]
        } else {
            Vec::new()
        });
    }

    if settings.is_unset(DefaultProperty::MacFrameworkPath) && platform == HostPlatform::Mac {
        config.mac_framework_path = Setting::Value(defaults.frameworks.clone());
    }

    if settings.is_unset(DefaultProperty::WindowsSdkVersion) && platform == HostPlatform::Windows {
        if let Some(version) = &defaults.windows_sdk_version {
            config.windows_sdk_version = Setting::Value(version.clone());
        }
    }

    // compile_commands.json names its own compiler
    let uses_compile_commands = !settings.is_unset(DefaultProperty::CompileCommands)
        || config.compile_commands.is_value();
    if settings.is_unset(DefaultProperty::CompilerPath) && !uses_compile_commands {
        if let Some(path) = &defaults.compiler_path {
            config.compiler_path = Setting::Value(path.clone());
        }
    }

    if settings.is_unset(DefaultProperty::CStandard) {
        if let Some(standard) = &defaults.c_standard {
            config.c_standard = Setting::Value(standard.clone());
        }
    }

    if settings.is_unset(DefaultProperty::CppStandard) {
        if let Some(standard) = &defaults.cpp_standard {
            config.cpp_standard = Setting::Value(standard.clone());
        }
    }

    if settings.is_unset(DefaultProperty::IntelliSenseMode) {
        let mode = defaults
            .intelli_sense_mode
            .clone()
            .unwrap_or_else(|| platform.default_intelli_sense_mode().to_string());
        config.intelli_sense_mode = Setting::Value(mode);
    }
}

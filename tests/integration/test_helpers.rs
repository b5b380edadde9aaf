use async_trait::async_trait;
use cpp_properties::core::platform::HostPlatform;
use cpp_properties::core::properties::{CppProperties, StoreOptions};
use cpp_properties::core::providers::{
    CustomConfigurationProvider, ProviderCapabilities, ProviderRegistry,
    SourceFileConfigurationItem,
};
use cpp_properties::core::settings::CppSettings;
use cpp_properties::core::watchers::{
    MessageLevel, PropertiesEvent, PropertiesNotifier, UserMessage,
};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use tokio::sync::broadcast;

/// A temporary workspace folder with helpers for its `.vscode` files
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp workspace"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn properties_path(&self) -> PathBuf {
        self.root().join(".vscode").join("c_cpp_properties.json")
    }

    /// Write c_cpp_properties.json with its mtime pushed ahead so polls notice it
    pub fn write_properties(&self, content: &str) {
        let path = self.properties_path();
        fs::create_dir_all(path.parent().expect("parent")).expect("create .vscode");
        fs::write(&path, content).expect("write properties");
        fs::File::options()
            .write(true)
            .open(&path)
            .and_then(|file| file.set_modified(SystemTime::now() + Duration::from_secs(5)))
            .expect("bump mtime");
    }

    pub fn write_properties_json(&self, value: &Value) {
        self.write_properties(&serde_json::to_string(value).expect("serialize"));
    }

    pub fn read_properties(&self) -> String {
        fs::read_to_string(self.properties_path()).expect("read properties")
    }

    pub fn read_properties_json(&self) -> Value {
        serde_json::from_str(&self.read_properties()).expect("properties are JSON")
    }

    pub fn open(&self) -> (CppProperties, broadcast::Receiver<PropertiesEvent>) {
        self.open_with(CppSettings::new(), Arc::new(ProviderRegistry::new()))
    }

    pub fn open_with(
        &self,
        settings: CppSettings,
        registry: Arc<ProviderRegistry>,
    ) -> (CppProperties, broadcast::Receiver<PropertiesEvent>) {
        self.open_on(HostPlatform::Linux, settings, registry)
    }

    pub fn open_on(
        &self,
        platform: HostPlatform,
        settings: CppSettings,
        registry: Arc<ProviderRegistry>,
    ) -> (CppProperties, broadcast::Receiver<PropertiesEvent>) {
        let (notifier, events) = PropertiesNotifier::new(256);
        let store = CppProperties::new(
            self.root(),
            settings,
            registry,
            notifier,
            StoreOptions {
                platform,
                await_include_scan: false,
                state_file: None,
            },
        );
        (store, events)
    }
}

/// Everything currently queued on `events`
pub fn drain(events: &mut broadcast::Receiver<PropertiesEvent>) -> Vec<PropertiesEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

pub fn messages(events: &[PropertiesEvent], level: MessageLevel) -> Vec<UserMessage> {
    events
        .iter()
        .filter_map(|event| match event {
            PropertiesEvent::Message(message) if message.level == level => Some(message.clone()),
            _ => None,
        })
        .collect()
}

pub fn configurations_changed(events: &[PropertiesEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, PropertiesEvent::ConfigurationsChanged(_)))
        .count()
}

/// Minimal provider with configurable identity and capabilities
pub struct StubProvider {
    pub name: String,
    pub extension_id: Option<String>,
    pub capabilities: ProviderCapabilities,
}

impl StubProvider {
    pub fn new(name: &str, extension_id: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            extension_id: extension_id.map(str::to_string),
            capabilities: ProviderCapabilities::all(),
        }
    }

    pub fn legacy(name: &str) -> Self {
        Self {
            capabilities: ProviderCapabilities::configuration_only(),
            ..Self::new(name, None)
        }
    }

    pub fn with_capabilities(mut self, capabilities: ProviderCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn shared(self) -> Arc<dyn CustomConfigurationProvider> {
        Arc::new(self)
    }
}

#[async_trait]
impl CustomConfigurationProvider for StubProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn extension_id(&self) -> Option<&str> {
        self.extension_id.as_deref()
    }

    fn capabilities(&self) -> ProviderCapabilities {
        self.capabilities
    }

    async fn can_provide_configuration(&self, _uri: &Path) -> bool {
        true
    }

    async fn provide_configurations(&self, _uris: &[PathBuf]) -> Vec<SourceFileConfigurationItem> {
        Vec::new()
    }
}

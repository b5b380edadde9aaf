//! Third-party configuration providers
//!
//! A provider declares the protocol version it registered with and the capabilities it
//! implements. [`RegisteredProvider`] lifts every version to the full capability surface:
//! browse-configuration calls are answered locally for providers older than
//! [`ApiVersion::V2`], and legacy providers start out not ready.

pub mod registry;

pub use registry::{ProviderRegistry, Registration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Provider protocol version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ApiVersion {
    /// Legacy: name-keyed, no disposal, readiness signalled later
    V0 = 0,
    /// Adds extension identity and disposal
    V1 = 1,
    /// Adds browse configuration
    V2 = 2,
}

impl ApiVersion {
    pub const LATEST: ApiVersion = ApiVersion::V2;
}

/// Methods a provider implementation actually backs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderCapabilities {
    pub can_provide_configuration: bool,
    pub provide_configurations: bool,
    pub dispose: bool,
    pub can_provide_browse_configuration: bool,
    pub provide_browse_configuration: bool,
}

impl ProviderCapabilities {
    /// Everything up to and including the latest protocol version
    pub fn all() -> Self {
        Self {
            can_provide_configuration: true,
            provide_configurations: true,
            dispose: true,
            can_provide_browse_configuration: true,
            provide_browse_configuration: true,
        }
    }

    /// The legacy surface: per-file configuration only
    pub fn configuration_only() -> Self {
        Self {
            can_provide_configuration: true,
            provide_configurations: true,
            ..Self::default()
        }
    }
}

/// Configuration a provider supplies for one source file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFileConfiguration {
    pub include_path: Vec<String>,
    pub defines: Vec<String>,
    pub intelli_sense_mode: Option<String>,
    pub standard: Option<String>,
    pub forced_include: Vec<String>,
    pub compiler_path: Option<String>,
    pub windows_sdk_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFileConfigurationItem {
    pub uri: PathBuf,
    pub configuration: SourceFileConfiguration,
}

/// Workspace-wide browse configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceBrowseConfiguration {
    pub browse_path: Vec<String>,
    pub compiler_path: Option<String>,
    pub standard: Option<String>,
    pub windows_sdk_version: Option<String>,
}

/// A third-party configuration source
#[async_trait]
pub trait CustomConfigurationProvider: Send + Sync {
    /// Display name
    fn name(&self) -> &str;

    /// Stable identity of the owning extension; absent for legacy providers
    fn extension_id(&self) -> Option<&str> {
        None
    }

    /// Which of the methods below are really implemented
    fn capabilities(&self) -> ProviderCapabilities;

    async fn can_provide_configuration(&self, uri: &Path) -> bool;

    async fn provide_configurations(&self, uris: &[PathBuf]) -> Vec<SourceFileConfigurationItem>;

    async fn can_provide_browse_configuration(&self) -> bool {
        false
    }

    async fn provide_browse_configuration(&self) -> WorkspaceBrowseConfiguration {
        WorkspaceBrowseConfiguration::default()
    }

    fn dispose(&self) {}
}

/// Identity a raw provider is keyed by: extension id if present, else name
pub fn provider_id(provider: &dyn CustomConfigurationProvider) -> &str {
    match provider.extension_id() {
        Some(id) if !id.is_empty() => id,
        _ => provider.name(),
    }
}

/// Normalized wrapper stored in the registry
pub struct RegisteredProvider {
    provider: Arc<dyn CustomConfigurationProvider>,
    version: ApiVersion,
    ready: AtomicBool,
}

impl RegisteredProvider {
    pub fn new(provider: Arc<dyn CustomConfigurationProvider>, version: ApiVersion) -> Self {
        // An implementation of the newer API talking through the legacy entry point
        let version = match (version, provider.extension_id()) {
            (ApiVersion::V0, Some(id)) if !id.is_empty() => ApiVersion::V1,
            _ => version,
        };
        Self {
            provider,
            version,
            ready: AtomicBool::new(version != ApiVersion::V0),
        }
    }

    /// Capabilities required at `version` that `provider` does not back
    pub fn missing_capabilities(
        provider: &dyn CustomConfigurationProvider,
        version: ApiVersion,
    ) -> Vec<&'static str> {
        let caps = provider.capabilities();
        let has_extension_id = provider.extension_id().is_some_and(|id| !id.is_empty());
        let mut missing = Vec::new();

        if provider.name().is_empty() {
            missing.push("'name'");
        }
        if version != ApiVersion::V0 && !has_extension_id {
            missing.push("'extensionId'");
        }
        if !caps.can_provide_configuration {
            missing.push("'canProvideConfiguration'");
        }
        if !caps.provide_configurations {
            missing.push("'provideConfigurations'");
        }
        if (version != ApiVersion::V0 || has_extension_id) && !caps.dispose {
            missing.push("'dispose'");
        }
        if version >= ApiVersion::V2 {
            if !caps.can_provide_browse_configuration {
                missing.push("'canProvideBrowseConfiguration'");
            }
            if !caps.provide_browse_configuration {
                missing.push("'provideBrowseConfiguration'");
            }
        }
        missing
    }

    pub fn is_valid(&self) -> bool {
        Self::missing_capabilities(self.provider.as_ref(), self.version).is_empty()
    }

    pub fn version(&self) -> ApiVersion {
        self.version
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Legacy providers call this once they can answer requests
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub fn name(&self) -> &str {
        self.provider.name()
    }

    /// Registry key; legacy providers are keyed by name
    pub fn extension_id(&self) -> &str {
        if self.version == ApiVersion::V0 {
            self.provider.name()
        } else {
            provider_id(self.provider.as_ref())
        }
    }

    pub async fn can_provide_configuration(&self, uri: &Path) -> bool {
        self.provider.can_provide_configuration(uri).await
    }

    pub async fn provide_configurations(&self, uris: &[PathBuf]) -> Vec<SourceFileConfigurationItem> {
        self.provider.provide_configurations(uris).await
    }

    pub async fn can_provide_browse_configuration(&self) -> bool {
        if self.version < ApiVersion::V2 {
            return false;
        }
        self.provider.can_provide_browse_configuration().await
    }

    pub async fn provide_browse_configuration(&self) -> WorkspaceBrowseConfiguration {
        if self.version < ApiVersion::V2 {
            return WorkspaceBrowseConfiguration::default();
        }
        self.provider.provide_browse_configuration().await
    }

    pub fn dispose(&self) {
        if self.version != ApiVersion::V0 {
            self.provider.dispose();
        }
    }
}

impl std::fmt::Debug for RegisteredProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredProvider")
            .field("name", &self.name())
            .field("extension_id", &self.extension_id())
            .field("version", &self.version)
            .field("ready", &self.is_ready())
            .finish()
    }
}

//! Registry of configuration providers, keyed by identity in registration order

use super::{provider_id, ApiVersion, CustomConfigurationProvider, RegisteredProvider};
use crate::core::errors::RegistrationError;
use indexmap::IndexMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, error, info, warn};

/// Outcome of a registration that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Added,
    /// A legacy provider re-registered under the same synthesized identity
    LegacyReplaced,
}

/// Provider collection owned by the application context and shared with every store
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<IndexMap<String, Arc<RegisteredProvider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexMap<String, Arc<RegisteredProvider>>> {
        self.providers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<String, Arc<RegisteredProvider>>> {
        self.providers.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Register `provider` at `version`, reporting why a registration was refused
    pub fn register(
        &self,
        provider: Arc<dyn CustomConfigurationProvider>,
        version: ApiVersion,
    ) -> Result<Registration, RegistrationError> {
        let wrapper = RegisteredProvider::new(provider, version);
        let missing =
            RegisteredProvider::missing_capabilities(wrapper.provider.as_ref(), wrapper.version());
        if !missing.is_empty() {
            return Err(RegistrationError::MissingCapabilities {
                provider: wrapper.name().to_string(),
                missing,
            });
        }

        let id = wrapper.extension_id().to_string();
        let mut providers = self.write();
        match providers.get(&id).map(|existing| existing.version()) {
            Some(ApiVersion::V0) if wrapper.version() == ApiVersion::V0 => {
                providers.insert(id, Arc::new(wrapper));
                Ok(Registration::LegacyReplaced)
            }
            Some(_) => Err(RegistrationError::Duplicate { id }),
            None => {
                info!("Registered configuration provider '{}' ({:?})", id, wrapper.version());
                providers.insert(id, Arc::new(wrapper));
                Ok(Registration::Added)
            }
        }
    }

    /// Register `provider`; true only when a new entry was added
    pub fn add(&self, provider: Arc<dyn CustomConfigurationProvider>, version: ApiVersion) -> bool {
        match self.register(provider, version) {
            Ok(Registration::Added) => true,
            Ok(Registration::LegacyReplaced) => {
                debug!("Legacy configuration provider re-registered");
                false
            }
            Err(e) => {
                error!("{}", e);
                false
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<RegisteredProvider>> {
        self.read().get(id).cloned()
    }

    /// Look up by the identity computed from a raw provider
    pub fn get_by_provider(
        &self,
        provider: &dyn CustomConfigurationProvider,
    ) -> Option<Arc<RegisteredProvider>> {
        self.get(provider_id(provider))
    }

    pub fn remove(&self, provider: &dyn CustomConfigurationProvider) {
        let id = provider_id(provider);
        if self.write().shift_remove(id).is_none() {
            warn!("Unable to remove configuration provider '{}': not registered", id);
        } else {
            info!("Removed configuration provider '{}'", id);
        }
    }

    /// Mark a legacy provider ready; false if `id` is unknown
    pub fn mark_ready(&self, id: &str) -> bool {
        match self.get(id) {
            Some(provider) => {
                provider.mark_ready();
                true
            }
            None => false,
        }
    }

    /// Map a persisted provider id onto a registered identity.
    ///
    /// An exact identity match is returned as is. Otherwise a single non-legacy provider whose
    /// display name equals `id` supplies its identity. Anything else returns `id` unchanged.
    pub fn check_id(&self, id: &str) -> String {
        if id.is_empty() {
            return id.to_string();
        }

        let providers = self.read();
        if providers.contains_key(id) {
            return id.to_string();
        }

        let found: Vec<&Arc<RegisteredProvider>> = providers
            .values()
            .filter(|p| p.version() != ApiVersion::V0 && p.name() == id)
            .collect();

        match found.as_slice() {
            [single] => {
                debug!("Provider id '{}' resolved to '{}'", id, single.extension_id());
                single.extension_id().to_string()
            }
            [] => id.to_string(),
            _ => {
                warn!("Duplicate provider name '{}' found. Not upgrading.", id);
                id.to_string()
            }
        }
    }

    /// Visit every provider in registration order
    pub fn for_each(&self, mut f: impl FnMut(&RegisteredProvider)) {
        let providers: Vec<Arc<RegisteredProvider>> = self.read().values().cloned().collect();
        for provider in &providers {
            f(provider);
        }
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.read().values()).finish()
    }
}

pub mod errors;
pub mod platform;
pub mod properties;
pub mod providers;
pub mod service;
pub mod settings;
pub mod variables;
pub mod watchers;

pub use errors::{ConfigError, PropertiesError, PropertiesResult, RegistrationError};
pub use platform::HostPlatform;
pub use properties::{CppProperties, StoreOptions};
pub use providers::{ApiVersion, CustomConfigurationProvider, ProviderRegistry};
pub use service::PropertiesService;
pub use settings::CppSettings;
pub use watchers::{PropertiesEvent, PropertiesNotifier, WatchEvent};

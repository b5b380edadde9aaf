//! # cpp-properties
//!
//! Configuration resolution for C/C++ IntelliSense.
//!
//! For a workspace folder, cpp-properties determines the active compiler, include and define
//! configuration to hand to a language-analysis backend, and keeps it consistent while its
//! inputs change independently: the on-disk `c_cpp_properties.json`, editor-level settings,
//! detected compiler defaults and third-party configuration providers.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cpp_properties::core::properties::{CppProperties, StoreOptions};
//! use cpp_properties::core::providers::ProviderRegistry;
//! use cpp_properties::core::settings::CppSettings;
//! use cpp_properties::core::watchers::PropertiesNotifier;
//! use std::sync::Arc;
//!
//! let (notifier, _events) = PropertiesNotifier::new(100);
//! let store = CppProperties::new(
//!     "/path/to/workspace",
//!     CppSettings::new(),
//!     Arc::new(ProviderRegistry::new()),
//!     notifier,
//!     StoreOptions::default(),
//! );
//! println!("{:?}", store.resolved());
//! ```
//!
//! ## Module Overview
//!
//! - [`core::properties`] - Document model, migration, merge and the per-folder store
//! - [`core::providers`] - Provider capability contract and registry
//! - [`core::variables`] - Placeholder resolution
//! - [`core::watchers`] - File watching and notifications
//! - [`config`] - Engine configuration
//! - [`cli`] - Command-line interface

/// Command-line interface and argument parsing
pub mod cli;
/// Engine configuration and platform paths
pub mod config;
/// Configuration store, providers, resolver and watchers
pub mod core;

pub use core::errors::{PropertiesError, PropertiesResult, RegistrationError};
pub use core::properties::{CppProperties, StoreOptions};
pub use core::providers::{ApiVersion, CustomConfigurationProvider, ProviderRegistry};

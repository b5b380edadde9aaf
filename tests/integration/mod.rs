// Integration test modules
pub mod migration_tests;
pub mod properties_store_tests;
pub mod provider_registry_tests;
pub mod service_tests;

// Workspace fixtures and stub providers
pub mod test_helpers;

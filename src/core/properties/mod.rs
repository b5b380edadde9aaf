//! c_cpp_properties.json: data model, migration, merge and the per-folder store

pub mod folder_state;
pub mod include_scan;
pub mod loader;
pub mod merge;
pub mod migration;
pub mod store;
pub mod types;

pub use include_scan::IncludeScan;
pub use loader::{parse_jsonc, properties_path, PROPERTIES_FILE_NAME};
pub use merge::{merge_bool, merge_list, merge_string, MergeContext};
pub use migration::{migrate, MigrationContext, MigrationOutcome};
pub use store::{CppProperties, DocumentHost, LogDocumentHost, StoreOptions};
pub use types::{
    Browse, CompilerDefaults, Configuration, ConfigurationDocument, ResolvedBrowse,
    ResolvedConfiguration, Setting, CURRENT_VERSION,
};

//! Read, parse and write c_cpp_properties.json

use super::types::ConfigurationDocument;
use crate::core::errors::{PropertiesError, PropertiesResult};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Properties file name inside the workspace config directory
pub const PROPERTIES_FILE_NAME: &str = "c_cpp_properties.json";

/// Workspace config directory name
pub const CONFIG_FOLDER_NAME: &str = ".vscode";

/// `<folder>/.vscode`
pub fn config_folder(folder: &Path) -> PathBuf {
    folder.join(CONFIG_FOLDER_NAME)
}

/// `<folder>/.vscode/c_cpp_properties.json`
pub fn properties_path(folder: &Path) -> PathBuf {
    config_folder(folder).join(PROPERTIES_FILE_NAME)
}

/// Parse strict JSON, falling back to JSON5 for comments and trailing commas.
///
/// On failure the strict parser's message is returned.
pub fn parse_jsonc(text: &str) -> Result<Value, String> {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => Ok(value),
        Err(strict) => match json5::from_str::<Value>(text) {
            Ok(value) => {
                debug!("Parsed document with JSON5 fallback");
                Ok(value)
            }
            Err(_) => Err(strict.to_string()),
        },
    }
}

/// Parse document text.
///
/// Returns `Ok(None)` for blank text, which happens while another process is still creating the
/// file. A document without configurations is a structural error.
pub fn parse_document(text: &str, path: &Path) -> PropertiesResult<Option<ConfigurationDocument>> {
    if text.trim().is_empty() {
        return Ok(None);
    }

    let value = parse_jsonc(text).map_err(|message| PropertiesError::Syntax {
        path: path.to_path_buf(),
        message,
    })?;

    let has_configurations = value
        .get("configurations")
        .and_then(Value::as_array)
        .is_some_and(|configurations| !configurations.is_empty());
    if !has_configurations {
        return Err(PropertiesError::Structural {
            path: path.to_path_buf(),
            reason: "Invalid configuration file. There must be at least one configuration present in the array.".to_string(),
        });
    }

    let document: ConfigurationDocument =
        serde_json::from_value(value).map_err(|e| PropertiesError::Structural {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    Ok(Some(document))
}

/// Read and parse the document at `path`
pub fn read_document(path: &Path) -> PropertiesResult<Option<ConfigurationDocument>> {
    let text = fs::read_to_string(path).map_err(|source| PropertiesError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(&text, path)
}

/// Serialize with 4-space indentation
pub fn to_pretty_string<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    // serde_json only emits valid UTF-8
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Write `document` to `path`, pretty-printed
pub fn write_document(path: &Path, document: &ConfigurationDocument) -> PropertiesResult<()> {
    let text = to_pretty_string(document).map_err(|e| PropertiesError::Write {
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidData, e),
    })?;
    fs::write(path, text).map_err(|source| PropertiesError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Wrote {}", path.display());
    Ok(())
}

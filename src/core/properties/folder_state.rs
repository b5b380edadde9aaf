//! Per-folder persisted state: the selected configuration index

use super::loader::to_pretty_string;
use crate::core::errors::{PropertiesError, PropertiesResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FolderEntry {
    current_configuration_index: usize,
}

/// Current configuration index for one workspace folder.
///
/// With a state file the index survives restarts; without one it only lives in memory.
#[derive(Debug, Clone)]
pub struct FolderState {
    state_file: Option<PathBuf>,
    key: String,
    current_index: Option<usize>,
}

impl FolderState {
    /// State that is never written anywhere
    pub fn in_memory(folder: &Path) -> Self {
        Self {
            state_file: None,
            key: folder.to_string_lossy().into_owned(),
            current_index: None,
        }
    }

    /// Load the folder's entry from `state_file`; unreadable files start empty
    pub fn load(state_file: PathBuf, folder: &Path) -> Self {
        let key = folder.to_string_lossy().into_owned();
        let current_index = match read_entries(&state_file) {
            Ok(entries) => entries.get(&key).map(|e| e.current_configuration_index),
            Err(e) => {
                warn!("{}", e);
                None
            }
        };
        debug!("Folder state for {}: {:?}", key, current_index);
        Self {
            state_file: Some(state_file),
            key,
            current_index,
        }
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// Record `index`, persisting when backed by a file
    pub fn set_current_index(&mut self, index: usize) -> PropertiesResult<()> {
        if self.current_index == Some(index) {
            return Ok(());
        }
        self.current_index = Some(index);

        let Some(path) = self.state_file.as_deref() else {
            return Ok(());
        };
        let mut entries = read_entries(path).unwrap_or_default();
        entries.insert(
            self.key.clone(),
            FolderEntry {
                current_configuration_index: index,
            },
        );
        write_entries(path, &entries)
    }
}

fn read_entries(path: &Path) -> PropertiesResult<BTreeMap<String, FolderEntry>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(source) => {
            return Err(PropertiesError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if text.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(&text).map_err(|e| PropertiesError::State {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn write_entries(path: &Path, entries: &BTreeMap<String, FolderEntry>) -> PropertiesResult<()> {
    let write_error = |source: io::Error| PropertiesError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    let text = to_pretty_string(entries).map_err(|e| PropertiesError::State {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    fs::write(path, text).map_err(write_error)
}

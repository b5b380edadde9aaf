//! Provider-independent include scan over a vcpkg installation

use crate::core::platform::HostPlatform;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Result of the include scan; empty when no vcpkg installation was found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeScan {
    /// `<vcpkg>/installed`, exposed to placeholders as `${vcpkgRoot}`
    pub vcpkg_root: Option<PathBuf>,
    /// `${vcpkgRoot}/<triplet>/include` entries
    pub includes: Vec<String>,
}

impl IncludeScan {
    /// Root as a string for the variable environment
    pub fn vcpkg_root_str(&self) -> Option<String> {
        self.vcpkg_root
            .as_ref()
            .map(|root| root.to_string_lossy().into_owned())
    }
}

/// Location of the file vcpkg writes its install root into
pub fn vcpkg_path_file(platform: HostPlatform) -> Option<PathBuf> {
    match platform {
        HostPlatform::Windows => dirs::data_local_dir().map(|dir| dir.join("vcpkg")),
        HostPlatform::Linux | HostPlatform::Mac => dirs::home_dir().map(|dir| dir.join(".vcpkg")),
    }
    .map(|dir| dir.join("vcpkg.path.txt"))
}

/// Scan using the host's vcpkg.path.txt
pub fn scan(platform: HostPlatform) -> IncludeScan {
    match vcpkg_path_file(platform) {
        Some(path) => scan_path_file(&path),
        None => IncludeScan::default(),
    }
}

/// Scan the installation named by a vcpkg.path.txt file
pub fn scan_path_file(path: &Path) -> IncludeScan {
    let Ok(content) = fs::read_to_string(path) else {
        debug!("No vcpkg path file at {}", path.display());
        return IncludeScan::default();
    };
    let root = content.trim();
    if root.is_empty() {
        return IncludeScan::default();
    }
    scan_installed(&Path::new(root).join("installed"))
}

/// Collect triplet include directories under `installed`
pub fn scan_installed(installed: &Path) -> IncludeScan {
    if !installed.is_dir() {
        return IncludeScan::default();
    }

    let includes: Vec<String> = WalkDir::new(installed)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir())
        .filter(|entry| entry.file_name() != "vcpkg")
        .filter(|entry| entry.path().join("include").is_dir())
        .map(|entry| format!("${{vcpkgRoot}}/{}/include", entry.file_name().to_string_lossy()))
        .collect();

    info!(
        "vcpkg include scan found {} triplet(s) under {}",
        includes.len(),
        installed.display()
    );
    IncludeScan {
        vcpkg_root: Some(installed.to_path_buf()),
        includes,
    }
}

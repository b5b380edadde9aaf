//! notify-backed watchers for the properties file, settings file and compile-commands files

use super::{CompileCommandsWatch, WatchEvent, WatchEventSender};
use crate::core::errors::{PropertiesError, PropertiesResult};
use crate::core::properties::loader::{config_folder, PROPERTIES_FILE_NAME};
use crate::core::settings::SETTINGS_FILE_NAME;
use glob::Pattern;
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// ENOSPC, reported by inotify when the per-user watch limit is exhausted
const WATCH_LIMIT_OS_ERROR: i32 = 28;

/// True for the "too many watches" failure the adapter silently degrades on
pub fn is_watch_limit(err: &notify::Error) -> bool {
    match &err.kind {
        notify::ErrorKind::MaxFilesWatch => true,
        notify::ErrorKind::Io(io) => io.raw_os_error() == Some(WATCH_LIMIT_OS_ERROR),
        _ => false,
    }
}

fn watch_error(path: &Path, source: notify::Error) -> PropertiesError {
    if is_watch_limit(&source) {
        PropertiesError::WatchLimit {
            path: path.to_path_buf(),
        }
    } else {
        PropertiesError::Watch {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Name patterns for the files the folder watcher reports
struct FolderPatterns {
    properties: Pattern,
    settings: Pattern,
}

impl FolderPatterns {
    fn new() -> Self {
        Self {
            properties: Pattern::new(&Pattern::escape(PROPERTIES_FILE_NAME))
                .unwrap_or_default(),
            settings: Pattern::new(&Pattern::escape(SETTINGS_FILE_NAME)).unwrap_or_default(),
        }
    }

    /// Translate a raw notify event into store events
    fn classify(&self, event: &Event) -> Vec<WatchEvent> {
        let mut events = Vec::new();
        for path in &event.paths {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let in_config_folder = path
                .parent()
                .and_then(Path::file_name)
                .is_some_and(|parent| parent == ".vscode");
            if !in_config_folder {
                continue;
            }

            if self.properties.matches(name) {
                let kind = match event.kind {
                    EventKind::Create(_) => Some(WatchEvent::PropertiesCreated),
                    EventKind::Remove(_) => Some(WatchEvent::PropertiesDeleted),
                    EventKind::Modify(ModifyKind::Name(_)) => Some(if path.exists() {
                        WatchEvent::PropertiesCreated
                    } else {
                        WatchEvent::PropertiesDeleted
                    }),
                    EventKind::Modify(_) => Some(WatchEvent::PropertiesChanged),
                    _ => None,
                };
                events.extend(kind);
            } else if self.settings.matches(name)
                && matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                )
            {
                events.push(WatchEvent::SettingsChanged);
            }
        }
        events.dedup();
        events
    }
}

/// Watches `<folder>/.vscode` for the properties and settings files
pub struct PropertiesWatcher {
    folder: PathBuf,
    watcher: RecommendedWatcher,
    config_folder_watched: bool,
}

impl PropertiesWatcher {
    pub fn start(folder: &Path, sender: WatchEventSender) -> PropertiesResult<Self> {
        let patterns = FolderPatterns::new();
        let watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    for watch_event in patterns.classify(&event) {
                        debug!("Folder watch event: {:?}", watch_event);
                        if sender.send(watch_event).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => warn!("Folder watch error: {}", e),
            },
            notify::Config::default(),
        )
        .map_err(|e| watch_error(folder, e))?;

        let mut this = Self {
            folder: folder.to_path_buf(),
            watcher,
            config_folder_watched: false,
        };
        this.ensure_config_folder_watched();
        info!("Watching {}", config_folder(folder).display());
        Ok(this)
    }

    /// Attach to `.vscode` once it exists; called again after it is created or removed
    pub fn ensure_config_folder_watched(&mut self) {
        let dir = config_folder(&self.folder);
        if !dir.is_dir() {
            self.config_folder_watched = false;
            return;
        }
        if self.config_folder_watched {
            return;
        }
        match self.watcher.watch(&dir, RecursiveMode::NonRecursive) {
            Ok(()) => self.config_folder_watched = true,
            Err(e) if is_watch_limit(&e) => {
                debug!("Watch limit reached for {}; relying on polling", dir.display())
            }
            Err(e) => warn!("{}", watch_error(&dir, e)),
        }
    }

    pub fn is_watching_config_folder(&self) -> bool {
        self.config_folder_watched
    }
}

/// Rebuilds one notify watcher over the current set of compile-commands files
pub struct NotifyCompileCommandsWatch {
    sender: WatchEventSender,
    watcher: Option<RecommendedWatcher>,
    watched: BTreeSet<PathBuf>,
}

impl NotifyCompileCommandsWatch {
    pub fn new(sender: WatchEventSender) -> Self {
        Self {
            sender,
            watcher: None,
            watched: BTreeSet::new(),
        }
    }

    pub fn watched(&self) -> &BTreeSet<PathBuf> {
        &self.watched
    }

    fn create_watcher(&self) -> Result<RecommendedWatcher, notify::Error> {
        let sender = self.sender.clone();
        RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                let Ok(event) = res else {
                    return;
                };
                // Renames also cover delete and re-create by build tools
                if !matches!(event.kind, EventKind::Modify(kind) if !matches!(kind, ModifyKind::Name(_)))
                {
                    return;
                }
                for path in event.paths {
                    if sender.send(WatchEvent::CompileCommandsChanged(path)).is_err() {
                        return;
                    }
                }
            },
            notify::Config::default(),
        )
    }
}

impl CompileCommandsWatch for NotifyCompileCommandsWatch {
    fn rebuild(&mut self, paths: &BTreeSet<PathBuf>) {
        self.watcher = None;
        self.watched.clear();
        if paths.is_empty() {
            return;
        }

        let mut watcher = match self.create_watcher() {
            Ok(watcher) => watcher,
            Err(e) if is_watch_limit(&e) => {
                debug!("Watch limit reached; compile commands will not be watched");
                return;
            }
            Err(e) => {
                warn!("Failed to create compile commands watcher: {}", e);
                return;
            }
        };

        for path in paths {
            match watcher.watch(path, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    debug!("Watching compile commands {}", path.display());
                    self.watched.insert(path.clone());
                }
                Err(e) if is_watch_limit(&e) => {
                    debug!("Watch limit reached for {}", path.display());
                }
                Err(e) => warn!("{}", watch_error(path, e)),
            }
        }
        self.watcher = Some(watcher);
    }
}

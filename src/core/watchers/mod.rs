//! File watching and change notification for a workspace folder

pub mod file_watcher;

pub use file_watcher::{NotifyCompileCommandsWatch, PropertiesWatcher};

use crate::core::errors::PropertiesError;
use crate::core::properties::types::ResolvedConfiguration;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

/// Severity of a message surfaced to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for MessageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// A message the host should show to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMessage {
    pub level: MessageLevel,
    pub text: String,
}

/// Notifications consumed by the analysis backend and the UI
#[derive(Debug, Clone, PartialEq)]
pub enum PropertiesEvent {
    /// The full resolved configuration list
    ConfigurationsChanged(Vec<ResolvedConfiguration>),
    SelectionChanged(usize),
    CompileCommandsChanged(PathBuf),
    Message(UserMessage),
}

/// Raw filesystem events the store reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    PropertiesCreated,
    PropertiesChanged,
    PropertiesDeleted,
    SettingsChanged,
    CompileCommandsChanged(PathBuf),
}

pub type WatchEventSender = mpsc::UnboundedSender<WatchEvent>;
pub type WatchEventReceiver = mpsc::UnboundedReceiver<WatchEvent>;

/// Broadcasts store notifications; sending without subscribers is not an error
#[derive(Clone)]
pub struct PropertiesNotifier {
    sender: broadcast::Sender<PropertiesEvent>,
}

impl PropertiesNotifier {
    pub fn new(capacity: usize) -> (Self, broadcast::Receiver<PropertiesEvent>) {
        let (sender, receiver) = broadcast::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    pub fn notify(&self, event: PropertiesEvent) {
        if self.sender.send(event).is_err() {
            debug!("No subscribers for properties event");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PropertiesEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Log and broadcast a user-facing message
    pub fn message(&self, level: MessageLevel, text: impl Into<String>) {
        let text = text.into();
        match level {
            MessageLevel::Info => info!("{}", text),
            MessageLevel::Warning => warn!("{}", text),
            MessageLevel::Error => error!("{}", text),
        }
        self.notify(PropertiesEvent::Message(UserMessage { level, text }));
    }

    /// Surface an error with the level its kind calls for
    pub fn report(&self, err: &PropertiesError) {
        let level = if err.is_parse_failure() {
            MessageLevel::Error
        } else {
            MessageLevel::Warning
        };
        self.message(level, err.to_string());
    }
}

/// Per-file watches over compile-commands databases
pub trait CompileCommandsWatch: Send {
    /// Drop every previous watch and watch exactly `paths`
    fn rebuild(&mut self, paths: &BTreeSet<PathBuf>);
}

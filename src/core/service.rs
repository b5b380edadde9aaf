//! Serial event loop driving one configuration store

use crate::core::errors::PropertiesResult;
use crate::core::properties::CppProperties;
use crate::core::watchers::{PropertiesWatcher, WatchEvent, WatchEventReceiver};
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Owns a store and feeds it watch events and fallback polls one at a time
pub struct PropertiesService {
    store: CppProperties,
    events: WatchEventReceiver,
    watcher: Option<PropertiesWatcher>,
    poll_interval: Duration,
}

impl PropertiesService {
    pub fn new(store: CppProperties, events: WatchEventReceiver, poll_interval: Duration) -> Self {
        Self {
            store,
            events,
            watcher: None,
            poll_interval,
        }
    }

    /// Keep the folder watcher alive for the lifetime of the loop
    pub fn with_watcher(mut self, watcher: PropertiesWatcher) -> Self {
        self.watcher = Some(watcher);
        self
    }

    pub fn store(&self) -> &CppProperties {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut CppProperties {
        &mut self.store
    }

    /// Dispatch one watch event to the store
    pub fn handle_event(&mut self, event: WatchEvent) -> PropertiesResult<()> {
        debug!("Handling {:?}", event);
        match event {
            WatchEvent::PropertiesCreated => self.store.on_properties_file_created(),
            WatchEvent::PropertiesChanged => self.store.on_properties_file_changed(),
            WatchEvent::PropertiesDeleted => self.store.on_properties_file_deleted(),
            WatchEvent::SettingsChanged => self.store.reload_settings(),
            WatchEvent::CompileCommandsChanged(path) => {
                self.store.on_compile_commands_changed(path);
                Ok(())
            }
        }
    }

    fn poll(&mut self) {
        if let Some(watcher) = self.watcher.as_mut() {
            watcher.ensure_config_folder_watched();
        }
        if let Err(e) = self.store.check_cpp_properties() {
            warn!("Fallback check failed: {}", e);
        }
    }

    /// Run until `shutdown` completes, then hand the store back
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> CppProperties {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!("Serving configurations for {}", self.store.root().display());
        let mut events_open = true;
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down properties service");
                    break;
                }
                event = self.events.recv(), if events_open => match event {
                    Some(event) => {
                        if let Err(e) = self.handle_event(event) {
                            warn!("Failed to handle watch event: {}", e);
                        }
                    }
                    None => {
                        debug!("Watch channel closed; polling only");
                        events_open = false;
                    }
                },
                _ = interval.tick() => self.poll(),
            }
        }
        self.store
    }
}

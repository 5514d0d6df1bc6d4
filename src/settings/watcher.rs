//! Settings file watcher for hot reload.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::settings::loader::load_settings;
use crate::settings::schema::ReaderSettings;

/// Watches the settings file and publishes every valid new version.
pub struct SettingsWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<ReaderSettings>,
}

impl SettingsWatcher {
    /// Create a new watcher.
    ///
    /// Returns the watcher and a receiver for reloaded settings.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ReaderSettings>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. The returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    tracing::info!(path = ?path, "Settings file change detected, reloading");
                    match load_settings(&path) {
                        Ok(settings) => {
                            let _ = tx.send(settings);
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to reload settings, keeping current");
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Settings watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?self.path, "Settings watcher started");
        Ok(watcher)
    }
}

/// Fields that differ between two settings and cannot be applied live.
pub fn restart_required_changes(current: &ReaderSettings, next: &ReaderSettings) -> Vec<&'static str> {
    let mut changed = Vec::new();
    if current.application_name != next.application_name {
        changed.push("application_name");
    }
    if current.initial_load != next.initial_load {
        changed.push("initial_load");
    }
    if current.store != next.store {
        changed.push("store");
    }
    if current.listener != next.listener {
        changed.push("listener");
    }
    if current.observability != next.observability {
        changed.push("observability");
    }
    changed
}

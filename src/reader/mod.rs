//! Typed, self-refreshing configuration reader.
//!
//! # Data Flow
//! ```text
//!                 ┌──────────────── ConfigReader ────────────────┐
//!  get_value ───▶ │ snapshot lookup → typed cache → convert       │
//!                 │        ▲                                       │
//!                 │        │ replace_all / remove_key              │
//!                 │   supervisor task ◀── commands ── listener task│ ◀── change feed
//!                 │     (ticker)    ◀── refresh()                  │
//!                 └────────┬───────────────────────────────────────┘
//!                          ▼
//!                    ConfigStore::fetch_active_entries
//! ```
//!
//! # Design Decisions
//! - Reads never touch the network and never wait on a refresh
//! - Only the supervisor task writes to the cache
//! - A failed refresh keeps the last good snapshot (stale-but-valid)
//! - Collaborators are injected; nothing global is created here

mod shared;
mod listener;
pub mod scheduler;
pub mod state;

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};

use crate::convert::{self, ConfigValue};
use crate::error::{ReaderError, ReaderResult};
use crate::feed::{ChangeFeed, SubscriptionId};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::settings::{InitialLoad, ReaderSettings};
use crate::store::ConfigStore;

use self::shared::ReaderCore;
use self::scheduler::{Command, Supervisor};
pub use self::scheduler::effective_interval;
pub use self::state::ReaderState;

/// Client-side view of one application's configuration.
pub struct ConfigReader {
    core: Arc<ReaderCore>,
    commands: mpsc::UnboundedSender<Command>,
    shutdown: Shutdown,
    /// Feed binding to release on shutdown.
    subscription: Option<(Arc<dyn ChangeFeed>, SubscriptionId)>,
    ready: watch::Receiver<bool>,
}

impl ConfigReader {
    /// Create a reader for `settings.application_name` and start its
    /// background tasks.
    ///
    /// With [`InitialLoad::Blocking`] this returns after the first load;
    /// a failed first load still yields a ready, empty, unhealthy reader.
    /// The feed is only used when `settings.listener.enabled` is set, and is
    /// subscribed before the first load so no change can slip in between.
    pub async fn start(
        settings: ReaderSettings,
        store: Arc<dyn ConfigStore>,
        feed: Option<Arc<dyn ChangeFeed>>,
    ) -> ReaderResult<Self> {
        let application = settings.application_name.trim().to_string();
        if application.is_empty() {
            return Err(ReaderError::Validation(
                "application name must not be blank".to_string(),
            ));
        }

        let (core, ready) = ReaderCore::new(application.clone(), store);
        let core = Arc::new(core);
        core.state.begin_loading();

        let shutdown = Shutdown::new();
        let (commands, command_rx) = mpsc::unbounded_channel();

        let feed = if settings.listener.enabled { feed } else { None };
        let mut subscription = None;
        if let Some(feed) = feed {
            match feed.subscribe(&application).await {
                Ok(bound) => {
                    tokio::spawn(listener::run_listener(
                        application.clone(),
                        bound.events,
                        commands.clone(),
                        shutdown.subscribe(),
                    ));
                    subscription = Some((feed, bound.id));
                }
                Err(e) => {
                    let error = ReaderError::Listener(e);
                    tracing::warn!(
                        application = %application,
                        error = %error,
                        "Change feed subscription failed, relying on scheduled refresh"
                    );
                }
            }
        }

        // Subscribed before the first fetch: changes committed after it are
        // queued as commands and applied once the load completes.
        let blocking = settings.initial_load == InitialLoad::Blocking;
        if blocking {
            core.initial_load().await;
        }

        let supervisor = Supervisor::new(
            core.clone(),
            command_rx,
            settings.refresh_interval(),
            !blocking,
        );
        tokio::spawn(supervisor.run(shutdown.subscribe()));

        Ok(Self {
            core,
            commands,
            shutdown,
            subscription,
            ready,
        })
    }

    pub fn application(&self) -> &str {
        &self.core.application
    }

    pub fn state(&self) -> ReaderState {
        self.core.state.get()
    }

    fn ensure_active(&self) -> ReaderResult<()> {
        if self.core.state.get() == ReaderState::Disposed {
            Err(ReaderError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Wait until the first load has completed (or the reader is disposed).
    pub async fn ready(&self) {
        let mut ready = self.ready.clone();
        // Err only when the core is gone, which also means "stop waiting".
        let _ = ready.wait_for(|done| *done).await;
    }

    /// Read `key` as `T`.
    ///
    /// Fails with `Validation` for a blank key, `NotFound` when the key is not
    /// active for this application, `TypeMismatch` when the declared type
    /// does not convert to `T`, and `Disposed` after shutdown.
    pub fn get_value<T: ConfigValue>(&self, key: &str) -> ReaderResult<T> {
        self.ensure_active()?;
        if key.trim().is_empty() {
            return Err(ReaderError::Validation("key must not be blank".to_string()));
        }

        let cached = self.core.cache.get(key).ok_or_else(|| ReaderError::NotFound {
            key: key.to_string(),
            application: self.core.application.clone(),
        })?;

        if let Some(value) = self
            .core
            .cache
            .get_typed(key, cached.generation)
            .and_then(|typed| T::from_typed(&typed))
        {
            metrics::record_typed_lookup(&self.core.application, true);
            return Ok(value);
        }
        metrics::record_typed_lookup(&self.core.application, false);

        let entry = &cached.entry;
        let typed = convert::convert_raw(&entry.raw_value, entry.declared_type, T::REPRESENTATION)?;
        let value = T::from_typed(&typed).ok_or_else(|| ReaderError::TypeMismatch {
            raw_value: entry.raw_value.clone(),
            declared: entry.declared_type,
            requested: T::REPRESENTATION,
        })?;
        self.core.cache.put_typed(key, cached.generation, typed);
        Ok(value)
    }

    /// Read `key` as `T`, falling back to `default` on any error.
    pub fn get_value_or<T: ConfigValue>(&self, key: &str, default: T) -> T {
        match self.get_value(key) {
            Ok(value) => value,
            Err(e) if e.is_not_found() => {
                tracing::debug!(application = %self.core.application, key = %key, "Key not found, using default");
                default
            }
            Err(e) => {
                tracing::warn!(
                    application = %self.core.application,
                    key = %key,
                    error = %e,
                    "Failed to read configuration value, using default"
                );
                default
            }
        }
    }

    /// Whether `key` is active for this application.
    pub fn has_key(&self, key: &str) -> ReaderResult<bool> {
        self.ensure_active()?;
        Ok(self.core.cache.contains(key))
    }

    /// Keys currently held; order not significant.
    pub fn all_keys(&self) -> ReaderResult<HashSet<String>> {
        self.ensure_active()?;
        Ok(self.core.cache.keys())
    }

    /// Force a full reload and wait for its outcome.
    ///
    /// Returns the number of active entries loaded. Reads are not blocked
    /// while the store is queried.
    pub async fn refresh(&self) -> ReaderResult<usize> {
        self.ensure_active()?;
        let (reply, outcome) = oneshot::channel();
        self.commands
            .send(Command::Refresh { reply })
            .map_err(|_| ReaderError::Disposed)?;
        outcome.await.map_err(|_| ReaderError::Disposed)?
    }

    /// Apply a new refresh interval (clamped to the minimum) to the scheduler.
    pub fn set_refresh_interval(&self, interval: Duration) -> ReaderResult<()> {
        self.ensure_active()?;
        self.commands
            .send(Command::SetInterval(interval))
            .map_err(|_| ReaderError::Disposed)
    }

    /// True iff the last refresh succeeded and the cache is non-empty.
    ///
    /// An application with no configured keys therefore reports unhealthy.
    pub fn is_healthy(&self) -> bool {
        self.core.state.get() != ReaderState::Disposed
            && self.core.status.last_refresh_succeeded()
            && !self.core.cache.is_empty()
    }

    pub fn last_successful_refresh(&self) -> Option<DateTime<Utc>> {
        self.core.status.last_success()
    }

    /// Stop background tasks, unsubscribe from the feed and drop the cache.
    ///
    /// Idempotent. An in-flight refresh is allowed to finish but its result
    /// is discarded.
    pub async fn shutdown(&self) {
        if !self.dispose() {
            return;
        }
        if let Some((feed, id)) = &self.subscription {
            if let Err(e) = feed.unsubscribe(id).await {
                let error = ReaderError::Listener(e);
                tracing::warn!(application = %self.core.application, error = %error, "Unsubscribe failed");
            }
        }
        tracing::info!(application = %self.core.application, "Reader disposed");
    }

    /// Synchronous part of shutdown. Returns `false` if already disposed.
    fn dispose(&self) -> bool {
        if !self.core.state.dispose() {
            return false;
        }
        self.shutdown.trigger();
        self.core.cache.close();
        self.core.release_waiters();
        true
    }
}

impl Drop for ConfigReader {
    fn drop(&mut self) {
        if !self.dispose() {
            return;
        }
        if let (Some((feed, id)), Ok(handle)) =
            (self.subscription.take(), tokio::runtime::Handle::try_current())
        {
            handle.spawn(async move {
                if let Err(e) = feed.unsubscribe(&id).await {
                    tracing::warn!(application = %id.application, error = %e, "Unsubscribe on drop failed");
                }
            });
        }
        tracing::debug!(application = %self.core.application, "Reader dropped without shutdown");
    }
}

impl fmt::Debug for ConfigReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigReader")
            .field("application", &self.core.application)
            .field("state", &self.state())
            .field("entries", &self.core.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConfigEntry, ConfigType};
    use crate::store::MemoryStore;

    fn settings() -> ReaderSettings {
        let mut settings = ReaderSettings::for_application("SERVICE-A");
        settings.listener.enabled = false;
        settings
    }

    fn store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::with_entries(vec![
            ConfigEntry::new("SERVICE-A", "MaxItemCount", ConfigType::Int, "50"),
            ConfigEntry::new("SERVICE-A", "Ratio", ConfigType::Double, "0.5"),
        ]))
    }

    #[tokio::test]
    async fn test_blank_application_rejected() {
        let err = ConfigReader::start(ReaderSettings::default(), store(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ReaderError::Validation(_)));
    }

    #[tokio::test]
    async fn test_typed_value_cached_per_representation() {
        let reader = ConfigReader::start(settings(), store(), None).await.unwrap();

        assert_eq!(reader.get_value::<i32>("MaxItemCount").unwrap(), 50);
        assert_eq!(reader.core.cache.typed_len(), 1);
        assert_eq!(reader.get_value::<i32>("MaxItemCount").unwrap(), 50);

        // A different representation of the same family replaces the slot.
        assert_eq!(reader.get_value::<i64>("MaxItemCount").unwrap(), 50);
        assert_eq!(reader.get_value::<f64>("Ratio").unwrap(), 0.5);
        assert_eq!(reader.core.cache.typed_len(), 2);
        reader.shutdown().await;
    }

    #[tokio::test]
    async fn test_type_mismatch_is_not_cached() {
        let reader = ConfigReader::start(settings(), store(), None).await.unwrap();
        assert!(matches!(
            reader.get_value::<bool>("MaxItemCount"),
            Err(ReaderError::TypeMismatch { .. })
        ));
        assert_eq!(reader.core.cache.typed_len(), 0);
        reader.shutdown().await;
    }

    #[tokio::test]
    async fn test_drop_disposes() {
        let reader = ConfigReader::start(settings(), store(), None).await.unwrap();
        let core = reader.core.clone();
        drop(reader);
        assert_eq!(core.state.get(), ReaderState::Disposed);
        assert!(core.cache.is_closed());
    }
}

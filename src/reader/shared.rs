//! State shared between the reader façade and its background tasks.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;

use crate::cache::ConfigCache;
use crate::error::{ReaderError, ReaderResult};
use crate::model::{ChangeEvent, ChangeKind};
use crate::observability::metrics::{self, RefreshOutcome};
use crate::reader::state::{ReaderState, RefreshStatus, StateCell};
use crate::store::ConfigStore;

pub(crate) struct ReaderCore {
    pub(crate) application: String,
    pub(crate) cache: ConfigCache,
    pub(crate) state: StateCell,
    pub(crate) status: RefreshStatus,
    store: Arc<dyn ConfigStore>,
    ready_tx: watch::Sender<bool>,
}

impl ReaderCore {
    pub(crate) fn new(
        application: String,
        store: Arc<dyn ConfigStore>,
    ) -> (Self, watch::Receiver<bool>) {
        let (ready_tx, ready_rx) = watch::channel(false);
        let core = Self {
            cache: ConfigCache::new(application.clone()),
            application,
            state: StateCell::new(),
            status: RefreshStatus::default(),
            store,
            ready_tx,
        };
        (core, ready_rx)
    }

    /// Fetch the active entries and replace the snapshot.
    ///
    /// Store failures leave the snapshot untouched and mark the reader
    /// unhealthy. A reload that finishes after disposal is discarded.
    pub(crate) async fn reload(&self, trigger: &'static str) -> ReaderResult<usize> {
        if self.state.get() == ReaderState::Disposed {
            metrics::record_refresh(&self.application, RefreshOutcome::Skipped);
            return Err(ReaderError::Disposed);
        }

        let entries = match self.store.fetch_active_entries(&self.application).await {
            Ok(entries) => entries,
            Err(e) => {
                self.status.mark_failure();
                metrics::record_refresh(&self.application, RefreshOutcome::Failure);
                tracing::warn!(
                    application = %self.application,
                    trigger,
                    error = %e,
                    "Refresh failed, serving last good snapshot"
                );
                return Err(ReaderError::StoreUnavailable(e));
            }
        };

        if !self.cache.replace_all(entries) {
            metrics::record_refresh(&self.application, RefreshOutcome::Skipped);
            tracing::debug!(application = %self.application, trigger, "Reader disposed, discarding refresh");
            return Err(ReaderError::Disposed);
        }

        let count = self.cache.len();
        self.status.mark_success(Utc::now());
        metrics::record_refresh(&self.application, RefreshOutcome::Success);
        metrics::record_cache_size(&self.application, count);
        tracing::debug!(application = %self.application, trigger, entries = count, "Configuration refreshed");
        Ok(count)
    }

    /// First load; reaches Ready whatever the outcome.
    pub(crate) async fn initial_load(&self) {
        if let Err(e) = self.reload("initial").await {
            tracing::warn!(application = %self.application, error = %e, "Initial load failed, starting empty");
        }
        if self.state.mark_ready() {
            tracing::info!(
                application = %self.application,
                entries = self.cache.len(),
                healthy = self.status.last_refresh_succeeded(),
                "Reader ready"
            );
        }
        self.ready_tx.send_replace(true);
    }

    /// React to one change event from the feed.
    pub(crate) async fn apply_change(&self, event: &ChangeEvent) {
        match event.change_type {
            ChangeKind::Deleted => {
                let removed = self.cache.remove_key(&event.configuration_name);
                metrics::record_cache_size(&self.application, self.cache.len());
                tracing::debug!(
                    application = %self.application,
                    key = %event.configuration_name,
                    removed,
                    "Removed key after delete event"
                );
            }
            ChangeKind::Created | ChangeKind::Updated | ChangeKind::StatusChanged => {
                // Reload failures are logged inside reload; the scheduler retries.
                let _ = self.reload("change_event").await;
            }
        }
    }

    /// Release anyone waiting for the first load.
    pub(crate) fn release_waiters(&self) {
        self.ready_tx.send_replace(true);
    }
}

//! Administrative writes with change notification.
//!
//! # Data Flow
//! ```text
//! create / update / set_active / delete
//!     → ConfigStore write
//!     → on success: exactly one ChangeEvent published (best effort)
//! ```
//!
//! A publish failure is logged and does not undo or fail the write; readers
//! converge on their next scheduled refresh.

use std::sync::Arc;

use crate::feed::ChangeNotifier;
use crate::model::{ChangeEvent, ChangeKind, ConfigEntry};
use crate::store::{ConfigStore, StoreResult};

/// Store writer that announces every successful mutation.
#[derive(Clone)]
pub struct ConfigAdmin {
    store: Arc<dyn ConfigStore>,
    notifier: Arc<dyn ChangeNotifier>,
}

impl ConfigAdmin {
    pub fn new(store: Arc<dyn ConfigStore>, notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self { store, notifier }
    }

    /// Insert `entry` and publish `Created`.
    pub async fn create(&self, entry: ConfigEntry) -> StoreResult<ConfigEntry> {
        let created = self.store.insert(entry).await?;
        self.announce(ChangeKind::Created, &created).await;
        Ok(created)
    }

    /// Replace the entry under `id` and publish `Updated`.
    ///
    /// Returns `false` (and publishes nothing) when no such entry exists.
    /// The event describes the submitted entry; nothing is read back after
    /// the write, so a committed update always gets its event.
    pub async fn update(&self, id: &str, mut entry: ConfigEntry) -> StoreResult<bool> {
        entry.id = id.to_string();
        if !self.store.update(id, entry.clone()).await? {
            return Ok(false);
        }
        self.announce(ChangeKind::Updated, &entry).await;
        Ok(true)
    }

    /// Toggle the active flag of `id` and publish `StatusChanged`.
    pub async fn set_active(&self, id: &str, active: bool) -> StoreResult<bool> {
        let Some(mut entry) = self.store.fetch_by_id(id).await? else {
            return Ok(false);
        };
        entry.active = active;
        if !self.store.update(id, entry.clone()).await? {
            return Ok(false);
        }
        self.announce(ChangeKind::StatusChanged, &entry).await;
        Ok(true)
    }

    /// Delete `id` and publish `Deleted`.
    pub async fn delete(&self, id: &str) -> StoreResult<bool> {
        let Some(entry) = self.store.fetch_by_id(id).await? else {
            return Ok(false);
        };
        if !self.store.delete(id).await? {
            return Ok(false);
        }
        self.announce(ChangeKind::Deleted, &entry).await;
        Ok(true)
    }

    async fn announce(&self, kind: ChangeKind, entry: &ConfigEntry) {
        let event = ChangeEvent::for_entry(kind, entry);
        match self.notifier.publish(&event).await {
            Ok(()) => tracing::debug!(
                application = %entry.application,
                key = %entry.key,
                kind = %kind,
                "Published change event"
            ),
            Err(e) => tracing::warn!(
                application = %entry.application,
                key = %entry.key,
                kind = %kind,
                error = %e,
                "Failed to publish change event, write kept"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{ChangeFeed, MemoryFeed};
    use crate::model::ConfigType;
    use crate::store::{MemoryStore, StoreError};
    use async_trait::async_trait;

    /// Store whose single-entry reads always fail.
    struct UnreadableStore(MemoryStore);

    #[async_trait]
    impl ConfigStore for UnreadableStore {
        async fn fetch_active_entries(&self, application: &str) -> StoreResult<Vec<ConfigEntry>> {
            self.0.fetch_active_entries(application).await
        }

        async fn fetch_by_id(&self, _id: &str) -> StoreResult<Option<ConfigEntry>> {
            Err(StoreError::Unavailable("read path down".to_string()))
        }

        async fn insert(&self, entry: ConfigEntry) -> StoreResult<ConfigEntry> {
            self.0.insert(entry).await
        }

        async fn update(&self, id: &str, entry: ConfigEntry) -> StoreResult<bool> {
            self.0.update(id, entry).await
        }

        async fn delete(&self, id: &str) -> StoreResult<bool> {
            self.0.delete(id).await
        }

        async fn health_check(&self) -> bool {
            self.0.health_check().await
        }
    }

    fn admin() -> (ConfigAdmin, MemoryStore, MemoryFeed) {
        let store = MemoryStore::new();
        let feed = MemoryFeed::new("configuration");
        let admin = ConfigAdmin::new(Arc::new(store.clone()), Arc::new(feed.clone()));
        (admin, store, feed)
    }

    #[tokio::test]
    async fn test_each_write_publishes_one_event() {
        let (admin, _store, feed) = admin();
        let mut events = feed.subscribe("SERVICE-A").await.unwrap().events;

        let created = admin
            .create(ConfigEntry::new("SERVICE-A", "SiteName", ConfigType::String, "soty.io"))
            .await
            .unwrap();
        let mut changed = created.clone();
        changed.raw_value = "example.com".to_string();
        assert!(admin.update(&created.id, changed).await.unwrap());
        assert!(admin.set_active(&created.id, false).await.unwrap());
        assert!(admin.delete(&created.id).await.unwrap());

        let mut kinds = Vec::new();
        while let Ok(item) = events.try_recv() {
            kinds.push(item.unwrap().change_type);
        }
        assert_eq!(
            kinds,
            vec![
                ChangeKind::Created,
                ChangeKind::Updated,
                ChangeKind::StatusChanged,
                ChangeKind::Deleted
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_entry_publishes_nothing() {
        let (admin, _store, feed) = admin();
        let mut events = feed.subscribe("SERVICE-A").await.unwrap().events;

        let entry = ConfigEntry::new("SERVICE-A", "SiteName", ConfigType::String, "x");
        assert!(!admin.update("missing", entry).await.unwrap());
        assert!(!admin.set_active("missing", true).await.unwrap());
        assert!(!admin.delete("missing").await.unwrap());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_publish_failure_keeps_write() {
        let (admin, store, feed) = admin();
        feed.set_available(false);

        let created = admin
            .create(ConfigEntry::new("SERVICE-A", "MaxItemCount", ConfigType::Int, "50"))
            .await
            .unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.fetch_by_id(&created.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_publishes_without_read_back() {
        let store = MemoryStore::with_entries(vec![ConfigEntry::new(
            "SERVICE-A",
            "MaxItemCount",
            ConfigType::Int,
            "50",
        )]);
        let id = store.id_of("SERVICE-A", "MaxItemCount").unwrap();
        let feed = MemoryFeed::new("configuration");
        let admin = ConfigAdmin::new(
            Arc::new(UnreadableStore(store.clone())),
            Arc::new(feed.clone()),
        );
        let mut events = feed.subscribe("SERVICE-A").await.unwrap().events;

        let entry = ConfigEntry::new("SERVICE-A", "MaxItemCount", ConfigType::Int, "99");
        assert!(admin.update(&id, entry).await.unwrap());

        assert_eq!(store.fetch_by_id(&id).await.unwrap().unwrap().raw_value, "99");
        let event = events.try_recv().unwrap().unwrap();
        assert_eq!(event.change_type, ChangeKind::Updated);
        assert_eq!(event.configuration_value.as_deref(), Some("99"));
        assert_eq!(event.configuration_id.as_deref(), Some(id.as_str()));
        assert!(events.try_recv().is_err());
    }
}

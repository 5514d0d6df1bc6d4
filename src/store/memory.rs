//! In-process configuration store.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::model::ConfigEntry;
use crate::store::{ConfigStore, StoreError, StoreResult};

/// A thread-safe store keeping entries in memory, keyed by id.
///
/// Availability can be toggled to simulate outages.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, ConfigEntry>>,
    available: Arc<AtomicBool>,
    fetches: Arc<AtomicUsize>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            available: Arc::new(AtomicBool::new(true)),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a store pre-populated with `entries`, assigning ids where missing.
    pub fn with_entries(entries: impl IntoIterator<Item = ConfigEntry>) -> Self {
        let store = Self::new();
        for mut entry in entries {
            if entry.id.is_empty() {
                entry.id = Uuid::new_v4().to_string();
            }
            store.entries.insert(entry.id.clone(), entry);
        }
        store
    }

    /// Make every call fail (`false`) or succeed again (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of `fetch_active_entries` calls received, failed ones included.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Find the id of `application`'s entry named `key`.
    pub fn id_of(&self, application: &str, key: &str) -> Option<String> {
        self.entries
            .iter()
            .find(|r| r.value().application == application && r.value().key == key)
            .map(|r| r.key().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store is offline".to_string()))
        }
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn fetch_active_entries(&self, application: &str) -> StoreResult<Vec<ConfigEntry>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.ensure_available()?;
        Ok(self
            .entries
            .iter()
            .filter(|r| r.value().active && r.value().application == application)
            .map(|r| r.value().clone())
            .collect())
    }

    async fn fetch_by_id(&self, id: &str) -> StoreResult<Option<ConfigEntry>> {
        self.ensure_available()?;
        Ok(self.entries.get(id).map(|r| r.value().clone()))
    }

    async fn insert(&self, mut entry: ConfigEntry) -> StoreResult<ConfigEntry> {
        self.ensure_available()?;
        entry.id = Uuid::new_v4().to_string();
        entry.created_at = Utc::now();
        entry.updated_at = None;
        self.entries.insert(entry.id.clone(), entry.clone());
        Ok(entry)
    }

    async fn update(&self, id: &str, mut entry: ConfigEntry) -> StoreResult<bool> {
        self.ensure_available()?;
        match self.entries.get_mut(id) {
            Some(mut existing) => {
                entry.id = id.to_string();
                entry.created_at = existing.created_at;
                entry.updated_at = Some(Utc::now());
                *existing = entry;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        self.ensure_available()?;
        Ok(self.entries.remove(id).is_some())
    }

    async fn health_check(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

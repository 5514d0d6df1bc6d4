//! In-memory configuration cache for one application.
//!
//! # Data Flow
//! ```text
//! full reload  → replace_all → new Snapshot swapped in, typed values cleared
//! delete event → remove_key  → Snapshot copy without the key, typed value dropped
//! typed read   → get_typed / put_typed, valid only for the entry generation
//! ```
//!
//! # Design Decisions
//! - The snapshot is an immutable map behind `ArcSwap`; readers never take a
//!   lock and never observe a half-built map
//! - Writers are serialized by a mutex that also records closure, so a
//!   reload finishing after shutdown cannot repopulate the cache
//! - Every entry carries the generation of the reload that produced it;
//!   typed values are stamped with that generation and ignored once the
//!   entry is replaced or removed

use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::convert::TypedValue;
use crate::model::ConfigEntry;

/// An entry as held by the snapshot.
#[derive(Debug, Clone)]
pub struct CachedEntry {
    pub entry: Arc<ConfigEntry>,
    /// Reload generation the entry was loaded in.
    pub generation: u64,
}

/// Immutable key → entry mapping.
#[derive(Debug, Default)]
pub struct Snapshot {
    entries: HashMap<String, CachedEntry>,
}

impl Snapshot {
    pub fn get(&self, key: &str) -> Option<&CachedEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }
}

#[derive(Debug, Clone)]
struct TypedSlot {
    generation: u64,
    value: TypedValue,
}

#[derive(Debug)]
struct WriterState {
    next_generation: u64,
    closed: bool,
}

/// Snapshot of active entries plus the derived typed-value cache.
#[derive(Debug)]
pub struct ConfigCache {
    application: String,
    snapshot: ArcSwap<Snapshot>,
    typed: DashMap<String, TypedSlot>,
    writer: Mutex<WriterState>,
}

impl ConfigCache {
    /// Create an empty cache owned by `application`.
    pub fn new(application: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            snapshot: ArcSwap::from_pointee(Snapshot::default()),
            typed: DashMap::new(),
            writer: Mutex::new(WriterState {
                next_generation: 1,
                closed: false,
            }),
        }
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    fn lock_writer(&self) -> MutexGuard<'_, WriterState> {
        // Writer state stays consistent even if a holder panicked.
        self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the whole snapshot with the active entries of this application.
    ///
    /// Returns `false` without touching anything if the cache was closed.
    pub fn replace_all(&self, entries: Vec<ConfigEntry>) -> bool {
        let mut writer = self.lock_writer();
        if writer.closed {
            return false;
        }

        let generation = writer.next_generation;
        writer.next_generation += 1;

        let mut map = HashMap::with_capacity(entries.len());
        for entry in entries {
            if !entry.active {
                continue;
            }
            if entry.application != self.application {
                tracing::warn!(
                    application = %self.application,
                    entry_application = %entry.application,
                    key = %entry.key,
                    "Dropping entry owned by another application"
                );
                continue;
            }
            map.insert(
                entry.key.clone(),
                CachedEntry {
                    entry: Arc::new(entry),
                    generation,
                },
            );
        }

        self.typed.clear();
        self.snapshot.store(Arc::new(Snapshot { entries: map }));
        true
    }

    /// Look up an entry by key.
    pub fn get(&self, key: &str) -> Option<CachedEntry> {
        self.snapshot.load().get(key).cloned()
    }

    /// Remove one key from both the snapshot and the typed cache.
    ///
    /// Returns `true` if the key was present.
    pub fn remove_key(&self, key: &str) -> bool {
        let writer = self.lock_writer();
        if writer.closed {
            return false;
        }

        let current = self.snapshot.load_full();
        let removed = current.get(key).is_some();
        if removed {
            let mut entries = current.entries.clone();
            entries.remove(key);
            self.snapshot.store(Arc::new(Snapshot { entries }));
        }
        self.typed.remove(key);
        drop(writer);
        removed
    }

    /// Typed value for `key`, if one was derived from `generation`.
    pub fn get_typed(&self, key: &str, generation: u64) -> Option<TypedValue> {
        self.typed
            .get(key)
            .filter(|slot| slot.generation == generation)
            .map(|slot| slot.value.clone())
    }

    /// Store a typed value derived from the entry of `generation`.
    ///
    /// Skipped when the entry has since been replaced or removed.
    pub fn put_typed(&self, key: &str, generation: u64, value: TypedValue) {
        let current = self.snapshot.load();
        match current.get(key) {
            Some(cached) if cached.generation == generation => {
                self.typed
                    .insert(key.to_string(), TypedSlot { generation, value });
            }
            _ => {
                tracing::trace!(key = %key, generation, "Skipping typed value for stale entry");
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.snapshot.load().get(key).is_some()
    }

    pub fn keys(&self) -> HashSet<String> {
        self.snapshot.load().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.load().is_empty()
    }

    /// Number of derived typed values currently held.
    pub fn typed_len(&self) -> usize {
        self.typed.len()
    }

    /// Discard all data and refuse further writes.
    pub fn close(&self) {
        let mut writer = self.lock_writer();
        writer.closed = true;
        self.typed.clear();
        self.snapshot.store(Arc::new(Snapshot::default()));
    }

    pub fn is_closed(&self) -> bool {
        self.lock_writer().closed
    }
}

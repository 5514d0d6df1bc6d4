//! Configuration store clients.
//!
//! # Responsibilities
//! - Fetch the active entry set of an application (the only call the
//!   reader makes)
//! - Single-entry reads and writes for the administrative side
//! - Report store reachability
//!
//! # Implementations
//! - `memory.rs`: in-process store, used for embedding and tests
//! - `http.rs`: REST client for a remote configuration service

pub mod http;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::ConfigEntry;

pub use http::HttpStore;
pub use memory::MemoryStore;

/// Errors returned by store clients.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport-level failure talking to the store.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with an unexpected status.
    #[error("Store returned status {status} for {path}")]
    Status { status: u16, path: String },

    /// The store response could not be decoded.
    #[error("Failed to decode store response: {0}")]
    Decode(String),

    /// The store is not reachable.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The configured store address is not a valid URL.
    #[error("Invalid store URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent owner of configuration entries.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// All active entries of `application`; order not significant.
    async fn fetch_active_entries(&self, application: &str) -> StoreResult<Vec<ConfigEntry>>;

    async fn fetch_by_id(&self, id: &str) -> StoreResult<Option<ConfigEntry>>;

    /// Insert a new entry, returning it with its assigned id.
    async fn insert(&self, entry: ConfigEntry) -> StoreResult<ConfigEntry>;

    /// Replace the entry stored under `id`. `false` if no such entry.
    async fn update(&self, id: &str, entry: ConfigEntry) -> StoreResult<bool>;

    /// Delete the entry stored under `id`. `false` if no such entry.
    async fn delete(&self, id: &str) -> StoreResult<bool>;

    async fn health_check(&self) -> bool;
}

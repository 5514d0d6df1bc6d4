//! Data model shared by the store, the change feed and the reader.
//!
//! # Data Flow
//! ```text
//! store ──ConfigEntry──▶ cache snapshot ──▶ convert ──▶ typed value
//! feed  ──ChangeEvent──▶ listener ──▶ reload / remove key
//! ```

pub mod entry;
pub mod event;

pub use entry::{ConfigEntry, ConfigType};
pub use event::{binding_pattern, topic_matches, ChangeEvent, ChangeKind};

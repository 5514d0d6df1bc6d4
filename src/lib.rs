//! Client-side configuration reader.
//!
//! Serves typed configuration values for one application from an in-memory
//! snapshot, kept fresh by a periodic full reload and by change events from
//! a push feed.

pub mod admin;
pub mod cache;
pub mod convert;
pub mod error;
pub mod feed;
pub mod lifecycle;
pub mod model;
pub mod observability;
pub mod reader;
pub mod resilience;
pub mod settings;
pub mod store;

pub use admin::ConfigAdmin;
pub use convert::{ConfigValue, Representation, TypedValue};
pub use error::{ReaderError, ReaderResult};
pub use model::{ChangeEvent, ChangeKind, ConfigEntry, ConfigType};
pub use reader::{ConfigReader, ReaderState};
pub use settings::ReaderSettings;

//! Reader settings subsystem.
//!
//! # Data Flow
//! ```text
//! settings file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ReaderSettings (validated, immutable)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new settings
//!     → refresh interval applied to the running reader
//!     → other changes logged as requiring a restart
//! ```

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_settings, parse_settings, SettingsError};
pub use schema::{
    InitialLoad, ListenerSettings, LogFormat, ObservabilitySettings, ReaderSettings,
    StoreSettings, MIN_REFRESH_INTERVAL_MS,
};
pub use validation::{validate_settings, ValidationError};
pub use watcher::SettingsWatcher;

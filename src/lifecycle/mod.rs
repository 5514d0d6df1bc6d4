//! Lifecycle management.
//!
//! # Data Flow
//! ```text
//! ConfigReader::shutdown / Drop
//!     → Shutdown::trigger (broadcast)
//!     → supervisor and listener tasks leave their loops
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;

//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! reader, scheduler, listener produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout via tracing-subscriber
//!     → Prometheus scrape endpoint (binary only)
//! ```

pub mod logging;
pub mod metrics;

//! Metrics collection and exposition.
//!
//! # Metrics
//! - `config_reader_refresh_total` (counter): reloads by application, outcome
//! - `config_reader_entries` (gauge): active entries held per application
//! - `config_reader_change_events_total` (counter): feed events by kind
//! - `config_reader_typed_lookups_total` (counter): typed cache hit/miss
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - Only the binary installs the Prometheus exporter

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

/// Outcome label of a reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Success,
    Failure,
    Skipped,
}

impl RefreshOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            RefreshOutcome::Success => "success",
            RefreshOutcome::Failure => "failure",
            RefreshOutcome::Skipped => "skipped",
        }
    }
}

/// Install the Prometheus exporter with an HTTP scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_refresh(application: &str, outcome: RefreshOutcome) {
    metrics::counter!(
        "config_reader_refresh_total",
        "application" => application.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

pub fn record_cache_size(application: &str, entries: usize) {
    metrics::gauge!("config_reader_entries", "application" => application.to_string())
        .set(entries as f64);
}

pub fn record_change_event(application: &str, kind: &'static str) {
    metrics::counter!(
        "config_reader_change_events_total",
        "application" => application.to_string(),
        "kind" => kind
    )
    .increment(1);
}

pub fn record_typed_lookup(application: &str, hit: bool) {
    metrics::counter!(
        "config_reader_typed_lookups_total",
        "application" => application.to_string(),
        "result" => if hit { "hit" } else { "miss" }
    )
    .increment(1);
}

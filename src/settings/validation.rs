//! Settings validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function: ReaderSettings → Result<(), Vec<ValidationError>>
//! - An interval below the minimum is clamped at use, not rejected

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::settings::schema::{ReaderSettings, MIN_REFRESH_INTERVAL_MS};

/// A single semantic problem in the settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check `settings` for semantic problems.
pub fn validate_settings(settings: &ReaderSettings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if settings.application_name.trim().is_empty() {
        errors.push(ValidationError::new("application_name", "must not be blank"));
    }

    if settings.refresh_interval_ms < MIN_REFRESH_INTERVAL_MS {
        tracing::warn!(
            configured_ms = settings.refresh_interval_ms,
            applied_ms = MIN_REFRESH_INTERVAL_MS,
            "Refresh interval below minimum, clamping"
        );
    }

    if let Err(e) = Url::parse(&settings.store.base_url) {
        errors.push(ValidationError::new(
            "store.base_url",
            format!("invalid URL '{}': {}", settings.store.base_url, e),
        ));
    }

    if settings.store.timeout_secs == 0 {
        errors.push(ValidationError::new("store.timeout_secs", "must be greater than 0"));
    }

    let listener = &settings.listener;
    if listener.enabled {
        if listener.namespace.trim().is_empty() {
            errors.push(ValidationError::new("listener.namespace", "must not be blank"));
        }
        if listener.endpoint.trim().is_empty() {
            errors.push(ValidationError::new("listener.endpoint", "must not be blank"));
        }
    }
    if listener.reconnect_base_ms > listener.reconnect_max_ms {
        errors.push(ValidationError::new(
            "listener.reconnect_base_ms",
            format!(
                "{} exceeds reconnect_max_ms {}",
                listener.reconnect_base_ms, listener.reconnect_max_ms
            ),
        ));
    }

    let observability = &settings.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address '{}'", observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

//! Reader settings definitions.
//!
//! All types derive Serde traits for deserialization from a TOML file.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lower bound applied to the refresh interval.
pub const MIN_REFRESH_INTERVAL_MS: u64 = 1000;

/// Root settings for a configuration reader.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReaderSettings {
    /// Application whose entries this reader serves.
    pub application_name: String,

    /// Period between scheduled full reloads, in milliseconds.
    pub refresh_interval_ms: u64,

    /// Whether construction waits for the first load.
    pub initial_load: InitialLoad,

    /// Store connection settings.
    pub store: StoreSettings,

    /// Change feed settings.
    pub listener: ListenerSettings,

    /// Logging and metrics settings.
    pub observability: ObservabilitySettings,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            application_name: String::new(),
            refresh_interval_ms: 30_000,
            initial_load: InitialLoad::Blocking,
            store: StoreSettings::default(),
            listener: ListenerSettings::default(),
            observability: ObservabilitySettings::default(),
        }
    }
}

impl ReaderSettings {
    /// Settings for `application` with everything else defaulted.
    pub fn for_application(application: impl Into<String>) -> Self {
        Self {
            application_name: application.into(),
            ..Self::default()
        }
    }

    /// Refresh interval after applying the lower bound.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(MIN_REFRESH_INTERVAL_MS))
    }
}

/// How the first load is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InitialLoad {
    /// `start` returns after the first load completed.
    Blocking,
    /// `start` returns immediately; the first load runs in the background.
    Background,
}

/// Store connection settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Base URL of the configuration service.
    pub base_url: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Change feed settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerSettings {
    /// Subscribe to push notifications.
    pub enabled: bool,

    /// First segment of every routing key.
    pub namespace: String,

    /// WebSocket endpoint of the feed.
    pub endpoint: String,

    /// Base reconnect delay in milliseconds.
    pub reconnect_base_ms: u64,

    /// Maximum reconnect delay in milliseconds.
    pub reconnect_max_ms: u64,
}

impl Default for ListenerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            namespace: "configuration".to_string(),
            endpoint: "ws://localhost:5000/changes".to_string(),
            reconnect_base_ms: 500,
            reconnect_max_ms: 30_000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Pretty,
}

/// Observability settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilitySettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Expose a Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9464".to_string(),
        }
    }
}

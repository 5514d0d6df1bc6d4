//! Configuration reader daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!   settings file ──▶ SettingsWatcher ──▶ set_refresh_interval
//!                                              │
//!                                              ▼
//!   HttpStore ◀── periodic / manual reload ── ConfigReader ◀── WsFeed (change events)
//!                                              │
//!                                              ▼
//!                                  health + key set logged on change
//! ```
//!
//! Runs a reader against a remote configuration service until Ctrl-C.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use config_reader::feed::{ChangeFeed, WsFeed};
use config_reader::observability::{logging, metrics};
use config_reader::settings::{load_settings, watcher::restart_required_changes, SettingsWatcher};
use config_reader::store::HttpStore;
use config_reader::ConfigReader;

#[derive(Parser)]
#[command(name = "config-reader")]
#[command(about = "Keeps an application's configuration cached and logs its health", long_about = None)]
struct Cli {
    /// Path to the reader settings file (TOML).
    #[arg(short, long, default_value = "reader.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut settings = load_settings(&cli.config)?;

    logging::init_logging(&settings.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "config-reader starting");

    if settings.observability.metrics_enabled {
        match settings.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %settings.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    tracing::info!(
        application = %settings.application_name,
        store = %settings.store.base_url,
        refresh_interval_ms = settings.refresh_interval_ms,
        listener_enabled = settings.listener.enabled,
        "Settings loaded"
    );

    let store = Arc::new(HttpStore::new(&settings.store)?);
    let feed: Option<Arc<dyn ChangeFeed>> = if settings.listener.enabled {
        Some(Arc::new(WsFeed::new(&settings.listener)?))
    } else {
        None
    };

    let reader = ConfigReader::start(settings.clone(), store, feed).await?;
    reader.ready().await;

    let (watcher, mut updates) = SettingsWatcher::new(&cli.config);
    let _watch_handle = match watcher.run() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Settings watcher unavailable, hot reload disabled");
            None
        }
    };

    let mut health_check = tokio::time::interval(Duration::from_secs(5));
    let mut last_healthy = None;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
            Some(next) = updates.recv() => {
                for field in restart_required_changes(&settings, &next) {
                    tracing::warn!(field, "Settings change requires a restart to take effect");
                }
                if next.refresh_interval_ms != settings.refresh_interval_ms {
                    reader.set_refresh_interval(next.refresh_interval())?;
                }
                settings = next;
            }
            _ = health_check.tick() => {
                let healthy = reader.is_healthy();
                if last_healthy != Some(healthy) {
                    let mut keys: Vec<String> = reader.all_keys()?.into_iter().collect();
                    keys.sort();
                    tracing::info!(
                        application = %reader.application(),
                        healthy,
                        last_success = ?reader.last_successful_refresh(),
                        keys = ?keys,
                        "Reader health changed"
                    );
                    last_healthy = Some(healthy);
                }
            }
        }
    }

    reader.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

//! Change feed consumption.
//!
//! # Event handling
//! ```text
//! Created / Updated / StatusChanged → full reload
//! Deleted                           → remove the key, no store round trip
//! ```
//! Events are forwarded to the supervisor, which applies them in order with
//! scheduled and manual refreshes. Feed failures are logged and never stop
//! the reader; the scheduler keeps the cache converging.

use tokio::sync::{broadcast, mpsc};

use crate::error::ReaderError;
use crate::feed::EventStream;
use crate::observability::metrics;
use crate::reader::scheduler::Command;

pub(crate) async fn run_listener(
    application: String,
    mut events: EventStream,
    commands: mpsc::UnboundedSender<Command>,
    mut shutdown: broadcast::Receiver<()>,
) {
    tracing::info!(application = %application, "Change listener started");

    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            item = events.recv() => match item {
                Some(Ok(event)) => {
                    if event.application_name != application {
                        tracing::debug!(
                            application = %application,
                            event_application = %event.application_name,
                            "Ignoring change event for another application"
                        );
                        continue;
                    }

                    tracing::debug!(
                        application = %application,
                        kind = %event.change_type,
                        key = %event.configuration_name,
                        "Change event received"
                    );
                    metrics::record_change_event(&application, event.change_type.topic_word());

                    if commands.send(Command::Change(event)).is_err() {
                        break;
                    }
                }
                Some(Err(e)) => {
                    let error = ReaderError::Listener(e);
                    tracing::warn!(application = %application, error = %error, "Dropping change event");
                }
                None => {
                    tracing::warn!(
                        application = %application,
                        "Change feed closed, relying on scheduled refresh"
                    );
                    break;
                }
            },
        }
    }

    tracing::info!(application = %application, "Change listener stopped");
}

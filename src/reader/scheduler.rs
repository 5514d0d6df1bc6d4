//! Refresh scheduling.
//!
//! A single supervisor task owns the refresh ticker and a command queue.
//! Scheduled ticks, manual refreshes, change events and interval updates are
//! handled one at a time in arrival order, so cache writes never come from
//! two code paths at once.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::error::ReaderResult;
use crate::model::ChangeEvent;
use crate::reader::shared::ReaderCore;
use crate::settings::MIN_REFRESH_INTERVAL_MS;

/// Interval actually used for a configured one.
pub fn effective_interval(configured: Duration) -> Duration {
    configured.max(Duration::from_millis(MIN_REFRESH_INTERVAL_MS))
}

/// Work items for the supervisor.
#[derive(Debug)]
pub(crate) enum Command {
    Refresh {
        reply: oneshot::Sender<ReaderResult<usize>>,
    },
    Change(ChangeEvent),
    SetInterval(Duration),
}

pub(crate) struct Supervisor {
    core: Arc<ReaderCore>,
    commands: mpsc::UnboundedReceiver<Command>,
    interval: Duration,
    initial_load_pending: bool,
}

impl Supervisor {
    pub(crate) fn new(
        core: Arc<ReaderCore>,
        commands: mpsc::UnboundedReceiver<Command>,
        interval: Duration,
        initial_load_pending: bool,
    ) -> Self {
        Self {
            core,
            commands,
            interval: effective_interval(interval),
            initial_load_pending,
        }
    }

    pub(crate) async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        if self.initial_load_pending {
            tokio::select! {
                _ = self.core.initial_load() => {}
                _ = shutdown.recv() => return,
            }
        }

        tracing::info!(
            application = %self.core.application,
            interval_ms = self.interval.as_millis() as u64,
            "Refresh scheduler started"
        );
        let mut ticker = new_ticker(self.interval);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command, &mut ticker).await,
                    None => break,
                },
                _ = ticker.tick() => {
                    // Failures are absorbed; health reflects them.
                    let _ = self.core.reload("scheduled").await;
                }
            }
        }
        tracing::info!(application = %self.core.application, "Refresh scheduler stopped");
    }

    async fn handle(&mut self, command: Command, ticker: &mut Interval) {
        match command {
            Command::Refresh { reply } => {
                let result = self.core.reload("manual").await;
                let _ = reply.send(result);
            }
            Command::Change(event) => {
                self.core.apply_change(&event).await;
            }
            Command::SetInterval(interval) => {
                let interval = effective_interval(interval);
                if interval != self.interval {
                    tracing::info!(
                        application = %self.core.application,
                        interval_ms = interval.as_millis() as u64,
                        "Refresh interval changed"
                    );
                    self.interval = interval;
                    *ticker = new_ticker(interval);
                }
            }
        }
    }
}

/// Ticker whose first tick is one period from now.
fn new_ticker(period: Duration) -> Interval {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

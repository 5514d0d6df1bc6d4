//! WebSocket change feed client.
//!
//! # Protocol
//! ```text
//! connect  <endpoint>?binding=<namespace>.<app>.*
//! receive  text frames {"topic": "<namespace>.<app>.<kind>", "event": {...}}
//! ```
//!
//! # Design Decisions
//! - One background session per subscription
//! - Frames whose topic does not match the binding are dropped client-side
//! - Lost connections are re-established with exponential backoff until the
//!   subscription is dropped or the subscriber goes away

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::StreamExt;
use serde::Deserialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::feed::{ChangeFeed, FeedError, FeedResult, Subscription, SubscriptionId};
use crate::model::{binding_pattern, topic_matches, ChangeEvent};
use crate::resilience::backoff::Backoff;
use crate::settings::ListenerSettings;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type EventSender = mpsc::UnboundedSender<FeedResult<ChangeEvent>>;

#[derive(Debug, Deserialize)]
struct Envelope {
    topic: String,
    event: serde_json::Value,
}

enum SessionEnd {
    Stopped,
    Disconnected(String),
}

/// Change feed reached over a WebSocket endpoint.
#[derive(Debug, Clone)]
pub struct WsFeed {
    endpoint: Url,
    namespace: String,
    reconnect_base_ms: u64,
    reconnect_max_ms: u64,
    /// subscription -> stop signal of its session.
    sessions: Arc<DashMap<SubscriptionId, watch::Sender<bool>>>,
    connected: Arc<AtomicUsize>,
}

impl WsFeed {
    pub fn new(settings: &ListenerSettings) -> FeedResult<Self> {
        let endpoint = Url::parse(&settings.endpoint)
            .map_err(|e| FeedError::Connect(format!("invalid endpoint '{}': {}", settings.endpoint, e)))?;
        match endpoint.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(FeedError::Connect(format!(
                    "unsupported scheme '{}', expected ws or wss",
                    other
                )))
            }
        }

        Ok(Self {
            endpoint,
            namespace: settings.namespace.clone(),
            reconnect_base_ms: settings.reconnect_base_ms,
            reconnect_max_ms: settings.reconnect_max_ms,
            sessions: Arc::new(DashMap::new()),
            connected: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn session_url(&self, pattern: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("binding", pattern);
        url
    }
}

#[async_trait]
impl ChangeFeed for WsFeed {
    async fn subscribe(&self, application: &str) -> FeedResult<Subscription> {
        let pattern = binding_pattern(&self.namespace, application);
        let url = self.session_url(&pattern);
        let (tx, rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);
        let id = SubscriptionId::new(application);
        self.sessions.insert(id.clone(), stop_tx);

        tracing::info!(application = %application, url = %url, "Starting change feed session");
        tokio::spawn(run_session(
            url,
            pattern,
            tx,
            stop_rx,
            Backoff::new(self.reconnect_base_ms, self.reconnect_max_ms),
            self.connected.clone(),
        ));
        Ok(Subscription { id, events: rx })
    }

    async fn unsubscribe(&self, id: &SubscriptionId) -> FeedResult<()> {
        if let Some((_, stop)) = self.sessions.remove(id) {
            let _ = stop.send(true);
            tracing::info!(application = %id.application, "Change feed session stopped");
        }
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.connected.load(Ordering::SeqCst) > 0
    }
}

async fn run_session(
    url: Url,
    pattern: String,
    tx: EventSender,
    mut stop: watch::Receiver<bool>,
    mut backoff: Backoff,
    connected: Arc<AtomicUsize>,
) {
    loop {
        if *stop.borrow() || tx.is_closed() {
            break;
        }

        let attempt = tokio::select! {
            res = tokio_tungstenite::connect_async(url.as_str()) => res,
            _ = stop.changed() => break,
        };

        match attempt {
            Ok((mut socket, _)) => {
                backoff.reset();
                connected.fetch_add(1, Ordering::SeqCst);
                tracing::info!(pattern = %pattern, "Change feed connected");

                let end = pump(&mut socket, &pattern, &tx, &mut stop).await;
                connected.fetch_sub(1, Ordering::SeqCst);

                match end {
                    SessionEnd::Stopped => {
                        let _ = socket.close(None).await;
                        break;
                    }
                    SessionEnd::Disconnected(reason) => {
                        tracing::warn!(pattern = %pattern, reason = %reason, "Change feed disconnected");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    pattern = %pattern,
                    attempt = backoff.attempt() + 1,
                    error = %e,
                    "Change feed connection failed"
                );
            }
        }

        let delay = backoff.next_delay();
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = stop.changed() => break,
        }
    }
    tracing::debug!(pattern = %pattern, "Change feed session exited");
}

async fn pump(
    socket: &mut Socket,
    pattern: &str,
    tx: &EventSender,
    stop: &mut watch::Receiver<bool>,
) -> SessionEnd {
    loop {
        tokio::select! {
            _ = stop.changed() => return SessionEnd::Stopped,
            frame = socket.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if let Some(item) = decode_frame(text.as_str(), pattern) {
                        if tx.send(item).is_err() {
                            return SessionEnd::Stopped;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    return SessionEnd::Disconnected("closed by server".to_string());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return SessionEnd::Disconnected(e.to_string()),
            },
        }
    }
}

/// Decode one text frame. `None` when the topic is outside the binding.
fn decode_frame(text: &str, pattern: &str) -> Option<FeedResult<ChangeEvent>> {
    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(e) => return Some(Err(FeedError::Decode(e.to_string()))),
    };

    if !topic_matches(pattern, &envelope.topic) {
        tracing::trace!(topic = %envelope.topic, pattern = %pattern, "Ignoring unbound topic");
        return None;
    }

    Some(serde_json::from_value(envelope.event).map_err(|e| FeedError::Decode(e.to_string())))
}

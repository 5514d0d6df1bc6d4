//! Push feed of configuration change events.
//!
//! # Data Flow
//! ```text
//! publisher ──publish(event)──▶ topic "<namespace>.<app>.<kind>"
//!     → every binding whose pattern matches
//!     → subscriber channel (Ok(event) or Err(decode failure))
//!     → reader listener task
//! ```
//!
//! # Design Decisions
//! - A subscription is a channel receiver rather than a callback, so the
//!   consumer decides where events are processed
//! - Malformed messages travel through the channel as errors so the
//!   consumer can log them against its own application
//! - One binding `<namespace>.<app>.*` per subscription; several readers
//!   of the same application each hold their own and unsubscribe only it

pub mod memory;
pub mod ws;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::model::ChangeEvent;

pub use memory::MemoryFeed;
pub use ws::WsFeed;

/// Errors that can occur on the change feed.
#[derive(Debug, Clone, Error)]
pub enum FeedError {
    /// Could not connect to the feed transport.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// A message could not be decoded into a change event.
    #[error("Malformed change event: {0}")]
    Decode(String),

    /// The feed closed the subscription.
    #[error("Feed closed")]
    Closed,

    /// The subscription request was rejected.
    #[error("Subscribe failed: {0}")]
    Subscribe(String),

    /// Publishing an event failed.
    #[error("Publish failed: {0}")]
    Publish(String),
}

/// Result type for feed operations.
pub type FeedResult<T> = Result<T, FeedError>;

/// Items delivered to a subscriber.
pub type EventStream = mpsc::UnboundedReceiver<FeedResult<ChangeEvent>>;

/// Handle naming one binding created by [`ChangeFeed::subscribe`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId {
    pub application: String,
    pub id: Uuid,
}

impl SubscriptionId {
    pub fn new(application: &str) -> Self {
        Self {
            application: application.to_string(),
            id: Uuid::new_v4(),
        }
    }
}

/// A live binding and the events routed to it.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub events: EventStream,
}

/// Consumer side of the change feed.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Bind to every change kind for `application`.
    async fn subscribe(&self, application: &str) -> FeedResult<Subscription>;

    /// Drop the binding named by `id`; its stream ends. Other bindings of
    /// the same application are untouched. Unknown ids are ignored.
    async fn unsubscribe(&self, id: &SubscriptionId) -> FeedResult<()>;

    async fn health_check(&self) -> bool;
}

/// Producer side of the change feed.
#[async_trait]
pub trait ChangeNotifier: Send + Sync {
    /// Publish one event under its routing key.
    async fn publish(&self, event: &ChangeEvent) -> FeedResult<()>;
}

//! In-process topic exchange.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::feed::{ChangeFeed, ChangeNotifier, FeedError, FeedResult, Subscription, SubscriptionId};
use crate::model::{binding_pattern, topic_matches, ChangeEvent};

#[derive(Debug)]
struct Binding {
    id: SubscriptionId,
    pattern: String,
    tx: mpsc::UnboundedSender<FeedResult<ChangeEvent>>,
}

/// Routes published events to subscribers by topic pattern.
#[derive(Debug, Clone)]
pub struct MemoryFeed {
    namespace: String,
    /// application -> bindings created by `subscribe`.
    bindings: Arc<DashMap<String, Vec<Binding>>>,
    available: Arc<AtomicBool>,
}

impl MemoryFeed {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            bindings: Arc::new(DashMap::new()),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Make subscribe and publish fail (`false`) or work again (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of live bindings across all applications.
    pub fn binding_count(&self) -> usize {
        self.bindings
            .iter()
            .map(|r| r.value().iter().filter(|b| !b.tx.is_closed()).count())
            .sum()
    }

    /// Publish a raw JSON payload under `topic`.
    ///
    /// Payloads that do not decode are delivered as errors to matching
    /// subscribers. Returns the number of subscribers reached.
    pub fn publish_raw(&self, topic: &str, payload: &str) -> usize {
        let item = serde_json::from_str::<ChangeEvent>(payload)
            .map_err(|e| FeedError::Decode(e.to_string()));
        self.route(topic, item)
    }

    /// Drop every binding, ending all subscriber streams.
    pub fn disconnect_all(&self) {
        self.bindings.clear();
    }

    fn route(&self, topic: &str, item: FeedResult<ChangeEvent>) -> usize {
        let mut delivered = 0;
        for mut bindings in self.bindings.iter_mut() {
            bindings.retain(|binding| {
                if !topic_matches(&binding.pattern, topic) {
                    return !binding.tx.is_closed();
                }
                match binding.tx.send(item.clone()) {
                    Ok(()) => {
                        delivered += 1;
                        true
                    }
                    Err(_) => false,
                }
            });
        }
        tracing::trace!(topic = %topic, delivered, "Routed change event");
        delivered
    }
}

#[async_trait]
impl ChangeFeed for MemoryFeed {
    async fn subscribe(&self, application: &str) -> FeedResult<Subscription> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(FeedError::Subscribe("memory feed is offline".to_string()));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let id = SubscriptionId::new(application);
        let pattern = binding_pattern(&self.namespace, application);
        tracing::debug!(application = %application, pattern = %pattern, "Binding subscriber");
        self.bindings
            .entry(application.to_string())
            .or_default()
            .push(Binding {
                id: id.clone(),
                pattern,
                tx,
            });
        Ok(Subscription { id, events: rx })
    }

    async fn unsubscribe(&self, id: &SubscriptionId) -> FeedResult<()> {
        if let Some(mut bindings) = self.bindings.get_mut(&id.application) {
            bindings.retain(|binding| binding.id != *id);
        }
        self.bindings
            .remove_if(&id.application, |_, bindings| bindings.is_empty());
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChangeNotifier for MemoryFeed {
    async fn publish(&self, event: &ChangeEvent) -> FeedResult<()> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(FeedError::Publish("memory feed is offline".to_string()));
        }
        let topic = event.routing_key(&self.namespace);
        self.route(&topic, Ok(event.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChangeKind, ConfigEntry, ConfigType};

    fn event(application: &str, kind: ChangeKind) -> ChangeEvent {
        let entry = ConfigEntry::new(application, "SiteName", ConfigType::String, "soty.io");
        ChangeEvent::for_entry(kind, &entry)
    }

    #[tokio::test]
    async fn test_routes_only_own_application() {
        let feed = MemoryFeed::new("configuration");
        let mut a = feed.subscribe("SERVICE-A").await.unwrap().events;
        let mut b = feed.subscribe("SERVICE-B").await.unwrap().events;

        feed.publish(&event("SERVICE-A", ChangeKind::Updated)).await.unwrap();
        feed.publish(&event("SERVICE-A", ChangeKind::Deleted)).await.unwrap();

        assert_eq!(a.recv().await.unwrap().unwrap().change_type, ChangeKind::Updated);
        assert_eq!(a.recv().await.unwrap().unwrap().change_type, ChangeKind::Deleted);
        assert!(b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_malformed_payload_delivered_as_error() {
        let feed = MemoryFeed::new("configuration");
        let mut rx = feed.subscribe("SERVICE-A").await.unwrap().events;

        let delivered = feed.publish_raw("configuration.SERVICE-A.updated", "{not json");
        assert_eq!(delivered, 1);
        assert!(matches!(rx.recv().await.unwrap(), Err(FeedError::Decode(_))));
    }

    #[tokio::test]
    async fn test_unsubscribe_ends_stream() {
        let feed = MemoryFeed::new("configuration");
        let Subscription { id, mut events } = feed.subscribe("SERVICE-A").await.unwrap();
        assert_eq!(feed.binding_count(), 1);

        feed.unsubscribe(&id).await.unwrap();
        assert!(events.recv().await.is_none());
        assert_eq!(feed.binding_count(), 0);
        // A second call is a no-op.
        feed.unsubscribe(&id).await.unwrap();
    }

    #[tokio::test]
    async fn test_unsubscribe_keeps_other_bindings_of_same_application() {
        let feed = MemoryFeed::new("configuration");
        let first = feed.subscribe("SERVICE-A").await.unwrap();
        let mut second = feed.subscribe("SERVICE-A").await.unwrap();
        assert_eq!(feed.binding_count(), 2);

        feed.unsubscribe(&first.id).await.unwrap();
        assert_eq!(feed.binding_count(), 1);

        feed.publish(&event("SERVICE-A", ChangeKind::Updated)).await.unwrap();
        let received = second.events.recv().await.unwrap().unwrap();
        assert_eq!(received.change_type, ChangeKind::Updated);
    }

    #[tokio::test]
    async fn test_dropped_receivers_are_pruned() {
        let feed = MemoryFeed::new("configuration");
        let subscription = feed.subscribe("SERVICE-A").await.unwrap();
        drop(subscription);

        feed.publish(&event("SERVICE-A", ChangeKind::Created)).await.unwrap();
        assert_eq!(feed.binding_count(), 0);
    }

    #[tokio::test]
    async fn test_offline_feed() {
        let feed = MemoryFeed::new("configuration");
        feed.set_available(false);
        assert!(feed.subscribe("SERVICE-A").await.is_err());
        assert!(feed.publish(&event("SERVICE-A", ChangeKind::Created)).await.is_err());
        assert!(!feed.health_check().await);
    }
}

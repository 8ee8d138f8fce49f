//! The subscription side of the bus.

use crate::event::BlockEvent;
use crate::pattern::EventFilter;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The event bus was closed.
    #[error("Event bus closed")]
    Closed,
}

/// A subscription handle for receiving filtered events.
pub struct Subscription {
    receiver: broadcast::Receiver<BlockEvent>,
    filter: EventFilter,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<BlockEvent>, filter: EventFilter) -> Self {
        Self { receiver, filter }
    }

    /// Receive the next event that matches the filter.
    ///
    /// Returns `None` when the bus is dropped. Lag (a slow subscriber
    /// overrunning its buffer) skips the lost events and keeps receiving;
    /// consumers requiring exactly-once must dedupe by hash.
    pub async fn recv(&mut self) -> Option<BlockEvent> {
        loop {
            let event = match self.receiver.recv().await {
                Ok(e) => e,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "Subscriber lagged, events dropped");
                    continue;
                }
            };

            if self.filter.matches(&event) {
                return Some(event);
            }
        }
    }

    /// Non-blocking receive.
    pub fn try_recv(&mut self) -> Result<Option<BlockEvent>, SubscriptionError> {
        loop {
            let event = match self.receiver.try_recv() {
                Ok(e) => e,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            };

            if self.filter.matches(&event) {
                return Ok(Some(event));
            }
        }
    }

    /// The filter for this subscription.
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

/// Stream adapter over a subscription, for SSE and combinators.
pub struct EventStream {
    subscription: Subscription,
}

impl EventStream {
    #[must_use]
    pub fn new(subscription: Subscription) -> Self {
        Self { subscription }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.subscription.filter
    }

    /// Consume the stream back into its subscription.
    pub fn into_subscription(self) -> Subscription {
        self.subscription
    }

    /// Await the next matching event.
    pub async fn next(&mut self) -> Option<BlockEvent> {
        self.subscription.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::{EventPublisher, InMemoryEventBus};
    use fb_types::{Block, StoredBlock, Visibility};
    use serde_json::Map;
    use std::time::Duration;
    use tokio::time::timeout;

    fn stored(block_type: &str) -> StoredBlock {
        let created = Block::create(block_type, Map::new(), Map::new()).unwrap();
        StoredBlock {
            chain_id: created.hash.clone(),
            hash: created.hash,
            block: created.block,
            author_hash: None,
            signature: None,
            protocol_version: fb_types::PROTOCOL_VERSION.to_string(),
            is_head: true,
            visibility: Visibility::Public,
            created_at: 0,
            sequence: 0,
        }
    }

    #[tokio::test]
    async fn test_recv_delivers_event() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());

        bus.publish(BlockEvent::new(stored("actor"))).await;

        let received = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout")
            .expect("event");
        assert_eq!(received.block_type(), "actor");
    }

    #[tokio::test]
    async fn test_filter_skips_non_matching() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::for_type("transfer.*"));

        bus.publish(BlockEvent::new(stored("actor"))).await;
        bus.publish(BlockEvent::new(stored("transfer.order"))).await;

        let received = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout")
            .expect("event");
        assert_eq!(received.block_type(), "transfer.order");
    }

    #[tokio::test]
    async fn test_insertion_order_preserved() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());

        for t in ["actor", "place", "substance"] {
            bus.publish(BlockEvent::new(stored(t))).await;
        }

        assert_eq!(sub.recv().await.unwrap().block_type(), "actor");
        assert_eq!(sub.recv().await.unwrap().block_type(), "place");
        assert_eq!(sub.recv().await.unwrap().block_type(), "substance");
    }

    #[tokio::test]
    async fn test_try_recv_empty() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());
        assert!(matches!(sub.try_recv(), Ok(None)));
    }

    #[tokio::test]
    async fn test_closed_bus_ends_stream() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());
        drop(bus);
        assert!(sub.recv().await.is_none());
    }
}

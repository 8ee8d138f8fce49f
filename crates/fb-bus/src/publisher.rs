//! The publishing side of the bus.

use crate::event::BlockEvent;
use crate::pattern::EventFilter;
use crate::subscriber::{EventStream, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Trait for publishing block events to the bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event. Returns the number of subscribers that received it.
    async fn publish(&self, event: BlockEvent) -> usize;

    /// Total events published over the bus lifetime.
    fn events_published(&self) -> u64;
}

/// In-memory bus over `tokio::sync::broadcast`.
///
/// Suitable for a single process; a distributed deployment would put the
/// same interface over an external broker.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<BlockEvent>,
    events_published: AtomicU64,
    capacity: usize,
}

impl InMemoryEventBus {
    /// Create a bus with the default per-subscriber buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a bus with a specific per-subscriber buffer.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe with a filter. Events are delivered in insertion order.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(types = ?filter.types, "New subscription created");
        Subscription::new(self.sender.subscribe(), filter)
    }

    /// Subscribe and wrap in a `Stream`.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.subscribe(filter))
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Per-subscriber buffer size.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: BlockEvent) -> usize {
        let block_type = event.block_type().to_string();
        let hash = event.block.hash.clone();

        self.events_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(event) {
            Ok(receiver_count) => {
                debug!(
                    block_type = %block_type,
                    hash = %hash.short(),
                    receivers = receiver_count,
                    "new_block published"
                );
                receiver_count
            }
            Err(e) => {
                warn!(
                    block_type = %block_type,
                    hash = %hash.short(),
                    error = %e,
                    "new_block dropped (no receivers)"
                );
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}

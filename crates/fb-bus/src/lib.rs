//! # FoodBlock Event Bus
//!
//! Turns inserts into a pattern-dispatched `new_block` stream consumed by
//! handlers, SSE clients, and the federation layer.
//!
//! The insert pipeline is the single source of truth for events: exactly one
//! publish per stored block, after commit. Handlers run fire-and-forget on
//! independent tasks; one handler's failure never blocks its siblings, and a
//! handler that emits new blocks re-enters the normal pipeline.
//!
//! Per-subscription delivery preserves insertion order. Slow subscribers lag
//! behind a bounded buffer and lose the oldest events; consumers that need
//! exactly-once semantics dedupe by hash.

pub mod event;
pub mod pattern;
pub mod publisher;
pub mod registry;
pub mod subscriber;

pub use event::BlockEvent;
pub use pattern::{EventFilter, TypePattern};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use registry::{spawn_dispatcher, BlockHandler, HandlerRegistry};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events buffered per subscriber before lag-drop.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        assert_eq!(DEFAULT_CHANNEL_CAPACITY, 1024);
    }
}

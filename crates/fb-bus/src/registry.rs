//! Handler registration and dispatch.
//!
//! Handlers are `(pattern set, function)` tuples registered at startup. The
//! dispatcher holds one subscription and spawns each matching handler on its
//! own task, so a slow or failing handler never blocks the listener or its
//! siblings.

use crate::event::BlockEvent;
use crate::pattern::{EventFilter, TypePattern};
use crate::publisher::InMemoryEventBus;
use async_trait::async_trait;
use fb_types::StoredBlock;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// A subscriber in the dispatch table.
#[async_trait]
pub trait BlockHandler: Send + Sync {
    /// Handler name, for logs.
    fn name(&self) -> &str;

    /// React to a stored block. Errors are the handler's own business; the
    /// dispatcher neither retries nor propagates.
    async fn handle(&self, block: Arc<StoredBlock>);
}

struct HandlerEntry {
    patterns: Vec<TypePattern>,
    handler: Arc<dyn BlockHandler>,
}

/// Registry of handlers built at startup.
#[derive(Default)]
pub struct HandlerRegistry {
    entries: Vec<HandlerEntry>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a pattern set.
    pub fn register(
        &mut self,
        patterns: Vec<TypePattern>,
        handler: Arc<dyn BlockHandler>,
    ) -> &mut Self {
        info!(
            handler = handler.name(),
            patterns = ?patterns.iter().map(TypePattern::as_str).collect::<Vec<_>>(),
            "Handler registered"
        );
        self.entries.push(HandlerEntry { patterns, handler });
        self
    }

    /// Handlers whose pattern set intersects a block type.
    pub fn matching(&self, block_type: &str) -> Vec<Arc<dyn BlockHandler>> {
        self.entries
            .iter()
            .filter(|entry| entry.patterns.iter().any(|p| p.matches(block_type)))
            .map(|entry| Arc::clone(&entry.handler))
            .collect()
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Run the dispatch loop until the bus is dropped.
///
/// One subscription feeds the loop; each matching handler is spawned
/// fire-and-forget per event.
pub fn spawn_dispatcher(
    bus: &InMemoryEventBus,
    registry: Arc<HandlerRegistry>,
) -> JoinHandle<()> {
    let mut subscription = bus.subscribe(EventFilter::all());
    tokio::spawn(async move {
        while let Some(event) = subscription.recv().await {
            let handlers = registry.matching(event.block_type());
            debug!(
                block_type = event.block_type(),
                hash = %event.block.hash.short(),
                handlers = handlers.len(),
                "Dispatching new_block"
            );
            for handler in handlers {
                let block = Arc::clone(&event.block);
                tokio::spawn(async move {
                    handler.handle(block).await;
                });
            }
        }
        info!("Event dispatcher stopped (bus closed)");
    })
}

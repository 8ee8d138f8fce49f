//! The event that flows through the bus.

use fb_types::StoredBlock;
use std::sync::Arc;

/// A block was inserted. Shared by reference: the bus fans one insert out to
/// every subscriber.
#[derive(Clone, Debug)]
pub struct BlockEvent {
    pub block: Arc<StoredBlock>,
}

impl BlockEvent {
    pub fn new(block: StoredBlock) -> Self {
        Self {
            block: Arc::new(block),
        }
    }

    /// The block type, for dispatch.
    pub fn block_type(&self) -> &str {
        self.block.block_type()
    }
}

//! # FoodBlock Test Suite
//!
//! Cross-crate scenarios and invariants:
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── chains.rs      # genesis/update/fork/approval/tombstone flows
//!     ├── agents.rs      # draft lifecycle through the bus
//!     ├── federation.rs  # handshake + push/pull round trips
//!     ├── language.rs    # NL entry end to end
//!     └── invariants.rs  # hashing, signing, batch permutation stability
//! ```
//!
//! Run with `cargo test -p fb-tests`.

#[cfg(test)]
mod integration;

#[cfg(test)]
pub(crate) mod support {
    use fb_bus::InMemoryEventBus;
    use fb_crypto::{sign_block, SigningKeyPair};
    use fb_store::{BlockSubmission, InsertPipeline, MemoryStore};
    use fb_types::{Block, Hash};
    use serde_json::{json, Map, Value};
    use std::sync::Arc;

    pub fn obj(v: Value) -> Map<String, Value> {
        v.as_object().expect("object literal").clone()
    }

    /// A fresh node core: store + bus + pipeline.
    pub struct Node {
        pub store: Arc<MemoryStore>,
        pub bus: Arc<InMemoryEventBus>,
        pub pipeline: Arc<InsertPipeline>,
    }

    impl Node {
        pub fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let bus = Arc::new(InMemoryEventBus::new());
            let pipeline = Arc::new(InsertPipeline::new(store.clone(), bus.clone()));
            Self {
                store,
                bus,
                pipeline,
            }
        }

        /// Register an actor with a published signing key.
        pub async fn actor(&self, key: &SigningKeyPair, name: &str) -> Hash {
            let block = Block::create(
                "actor.business",
                obj(json!({"name": name, "public_key": key.public_key().to_hex()})),
                Map::new(),
            )
            .unwrap();
            self.pipeline
                .insert(BlockSubmission::bare(block.block))
                .await
                .unwrap()
                .block
                .hash
        }

        /// Insert a signed block.
        pub async fn signed(
            &self,
            block: &Block,
            author: Hash,
            key: &SigningKeyPair,
        ) -> fb_types::StoredBlock {
            let wrapper = sign_block(block, author, key).unwrap();
            self.pipeline
                .insert(BlockSubmission::signed(wrapper))
                .await
                .unwrap()
                .block
        }

        /// Insert an unsigned block.
        pub async fn bare(&self, block: Block) -> fb_types::StoredBlock {
            self.pipeline
                .insert(BlockSubmission::bare(block))
                .await
                .unwrap()
                .block
        }
    }
}

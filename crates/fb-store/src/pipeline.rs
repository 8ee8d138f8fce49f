//! The insert pipeline.
//!
//! Every mutation enters here: validation, hash integrity, signature
//! verification, author-scoped update resolution, visibility derivation, and
//! exactly one `new_block` emission per stored block. There is no second
//! event source.
//!
//! Fork creation is a normal graph outcome, never an error: a successor by a
//! different, unapproved author becomes its own chain and the predecessor
//! keeps its head.

use crate::errors::StoreError;
use crate::store::{BlockStore, InsertPlan};
use fb_bus::{BlockEvent, EventPublisher, InMemoryEventBus};
use fb_crypto::{verify_wrapper, Ed25519PublicKey};
use fb_types::{mechanism, Block, Hash, SignedWrapper, StoredBlock, Visibility, PROTOCOL_VERSION};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// A parsed submission: a bare block or a signed wrapper, optionally with a
/// client-supplied hash to check against.
#[derive(Debug, Clone)]
pub struct BlockSubmission {
    pub block: Block,
    pub author_hash: Option<Hash>,
    pub signature: Option<String>,
    pub supplied_hash: Option<Hash>,
}

impl BlockSubmission {
    /// Parse a request body: either `{type,state,refs}` or
    /// `{foodblock, author_hash, signature, protocol_version}`, each with an
    /// optional `hash`.
    pub fn from_value(value: Value) -> Result<Self, StoreError> {
        let Value::Object(mut map) = value else {
            return Err(StoreError::BadRequest("body must be a JSON object".to_string()));
        };

        let supplied_hash = match map.remove("hash") {
            Some(Value::String(s)) => {
                Some(Hash::new(s).map_err(|e| StoreError::BadRequest(e.to_string()))?)
            }
            Some(_) => return Err(StoreError::BadRequest("hash must be a string".to_string())),
            None => None,
        };

        if map.contains_key("foodblock") {
            let wrapper: SignedWrapper = serde_json::from_value(Value::Object(map))
                .map_err(|e| StoreError::BadRequest(format!("malformed wrapper: {e}")))?;
            return Ok(Self {
                block: wrapper.foodblock,
                author_hash: Some(wrapper.author_hash),
                signature: Some(wrapper.signature),
                supplied_hash,
            });
        }

        let block: Block = serde_json::from_value(Value::Object(map))
            .map_err(|e| StoreError::BadRequest(format!("malformed block: {e}")))?;
        Ok(Self {
            block,
            author_hash: None,
            signature: None,
            supplied_hash,
        })
    }

    /// Wrap an in-process block (no signature, no author).
    pub fn bare(block: Block) -> Self {
        Self {
            block,
            author_hash: None,
            signature: None,
            supplied_hash: None,
        }
    }

    /// Wrap a signed wrapper.
    pub fn signed(wrapper: SignedWrapper) -> Self {
        Self {
            block: wrapper.foodblock,
            author_hash: Some(wrapper.author_hash),
            signature: Some(wrapper.signature),
            supplied_hash: None,
        }
    }
}

/// Result of one insert.
#[derive(Debug, Clone)]
pub struct InsertOutcome {
    pub block: StoredBlock,
    /// True when the hash was already stored; no event was re-emitted.
    pub exists: bool,
}

/// Per-item status inside a batch report.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Inserted,
    Skipped,
    Failed,
    UnresolvedDependency,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BatchItemResult {
    pub index: usize,
    pub hash: Option<Hash>,
    pub status: BatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Multi-pass batch insert report. Errors are isolated per block.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BatchReport {
    pub inserted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub results: Vec<BatchItemResult>,
}

/// The single writer of record. Wraps the store with resolution rules and
/// serializes commits so head transitions and event order match insertion
/// order.
pub struct InsertPipeline {
    store: Arc<dyn BlockStore>,
    bus: Arc<InMemoryEventBus>,
    write_lock: Mutex<()>,
}

impl InsertPipeline {
    pub fn new(store: Arc<dyn BlockStore>, bus: Arc<InMemoryEventBus>) -> Self {
        Self {
            store,
            bus,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn BlockStore> {
        &self.store
    }

    pub fn bus(&self) -> &Arc<InMemoryEventBus> {
        &self.bus
    }

    /// Insert one block. See module docs for the resolution rules.
    pub async fn insert(&self, submission: BlockSubmission) -> Result<InsertOutcome, StoreError> {
        let BlockSubmission {
            block,
            author_hash,
            signature,
            supplied_hash,
        } = submission;

        validate_block(&block)?;

        // Signature check happens when the author's published key is known;
        // unknown authors are accepted content-addressed.
        if let (Some(author), Some(sig)) = (&author_hash, &signature) {
            if let Some(key) = self.published_key(author) {
                let wrapper = SignedWrapper {
                    foodblock: block.clone(),
                    author_hash: author.clone(),
                    signature: sig.clone(),
                    protocol_version: PROTOCOL_VERSION.to_string(),
                };
                if verify_wrapper(&wrapper, &key).is_err() {
                    warn!(author = %author.short(), "Rejected block with bad signature");
                    return Err(StoreError::InvalidSignature(author.clone()));
                }
            } else {
                debug!(author = %author.short(), "Author key unknown, accepting unverified");
            }
        }

        let computed = block.hash()?;
        if let Some(supplied) = supplied_hash {
            if supplied != computed {
                return Err(StoreError::HashMismatch {
                    supplied,
                    computed,
                });
            }
        }

        let _guard = self.write_lock.lock().await;

        if let Some(existing) = self.store.get(&computed) {
            debug!(hash = %computed.short(), "Duplicate insert, returning existing");
            return Ok(InsertOutcome {
                block: existing,
                exists: true,
            });
        }

        let resolution = self.resolve(&block, &computed, author_hash.as_ref());
        let visibility = derive_visibility(&block);

        let record = StoredBlock {
            hash: computed,
            block,
            author_hash,
            signature,
            protocol_version: PROTOCOL_VERSION.to_string(),
            chain_id: resolution.chain_id,
            is_head: true,
            visibility,
            created_at: 0,
            sequence: 0,
        };

        let stored = self.store.commit(InsertPlan {
            record,
            retire_heads: resolution.retire_heads,
            tombstone_target: resolution.tombstone_target,
        })?;

        // Exactly one emission per stored block, inside the serialization
        // window so per-subscription order matches insertion order.
        self.bus.publish(BlockEvent::new(stored.clone())).await;

        Ok(InsertOutcome {
            block: stored,
            exists: false,
        })
    }

    /// Insert a raw JSON body.
    pub async fn insert_value(&self, value: Value) -> Result<InsertOutcome, StoreError> {
        self.insert(BlockSubmission::from_value(value)?).await
    }

    /// Multi-pass dependency-ordered batch insert.
    ///
    /// A block whose predecessor is neither stored nor yet inserted from the
    /// batch waits for a later pass; when a full pass makes no progress the
    /// leftovers are reported as unresolved dependencies.
    pub async fn insert_batch(&self, items: Vec<Value>) -> BatchReport {
        let mut results: Vec<Option<BatchItemResult>> = vec![None; items.len()];
        let mut pending: Vec<(usize, BlockSubmission)> = Vec::new();

        for (index, value) in items.into_iter().enumerate() {
            match BlockSubmission::from_value(value) {
                Ok(submission) => pending.push((index, submission)),
                Err(e) => {
                    results[index] = Some(BatchItemResult {
                        index,
                        hash: None,
                        status: BatchStatus::Failed,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        loop {
            let mut progressed = false;
            let mut next_round = Vec::new();

            for (index, submission) in pending {
                let dependency_met = match submission.block.updates_ref() {
                    None => true,
                    Some(prev) => self.store.contains(&prev),
                };
                if !dependency_met {
                    next_round.push((index, submission));
                    continue;
                }

                progressed = true;
                let hash = submission.block.hash().ok();
                match self.insert(submission).await {
                    Ok(outcome) if outcome.exists => {
                        results[index] = Some(BatchItemResult {
                            index,
                            hash,
                            status: BatchStatus::Skipped,
                            error: None,
                        });
                    }
                    Ok(_) => {
                        results[index] = Some(BatchItemResult {
                            index,
                            hash,
                            status: BatchStatus::Inserted,
                            error: None,
                        });
                    }
                    Err(e) => {
                        results[index] = Some(BatchItemResult {
                            index,
                            hash,
                            status: BatchStatus::Failed,
                            error: Some(e.to_string()),
                        });
                    }
                }
            }

            if next_round.is_empty() || !progressed {
                for (index, submission) in next_round {
                    results[index] = Some(BatchItemResult {
                        index,
                        hash: submission.block.hash().ok(),
                        status: BatchStatus::UnresolvedDependency,
                        error: Some("unresolved dependency".to_string()),
                    });
                }
                break;
            }
            pending = next_round;
        }

        let results: Vec<BatchItemResult> = results.into_iter().flatten().collect();
        let inserted = results.iter().filter(|r| r.status == BatchStatus::Inserted).count();
        let skipped = results.iter().filter(|r| r.status == BatchStatus::Skipped).count();
        let failed = results.len() - inserted - skipped;

        info!(inserted, skipped, failed, "Batch insert finished");
        BatchReport {
            inserted,
            skipped,
            failed,
            results,
        }
    }

    /// Author-scoped update resolution (the production rule).
    fn resolve(&self, block: &Block, hash: &Hash, author: Option<&Hash>) -> Resolution {
        let mut resolution = match block.updates_ref() {
            None => Resolution::new_chain(hash),
            Some(prev_hash) => match self.store.get(&prev_hash) {
                // Dangling predecessor: the block still lands, as its own
                // chain. Batch inserts gate on this to preserve ordering.
                None => Resolution::new_chain(hash),
                Some(prev) => self.resolve_successor(block, hash, author, &prev),
            },
        };

        // A merge retires every listed head and adopts the first merged
        // chain as the union chain.
        if block.block_type == mechanism::MERGE {
            let mut adopted_chain = None;
            for target in block.ref_values("merges") {
                if let Some(merged) = self.store.get(&target) {
                    if adopted_chain.is_none() {
                        adopted_chain = Some(merged.chain_id.clone());
                    }
                    resolution.retire_heads.push(target);
                }
            }
            if block.updates_ref().is_none() {
                if let Some(chain) = adopted_chain {
                    resolution.chain_id = chain;
                }
            }
        }

        resolution
    }

    fn resolve_successor(
        &self,
        block: &Block,
        hash: &Hash,
        author: Option<&Hash>,
        prev: &StoredBlock,
    ) -> Resolution {
        // Tombstones attach regardless of author; erasure rights are the
        // operator's responsibility at the gateway layer.
        if block.block_type == mechanism::TOMBSTONE {
            let target = block
                .ref_values("target")
                .into_iter()
                .next()
                .unwrap_or_else(|| prev.hash.clone());
            return Resolution {
                chain_id: prev.chain_id.clone(),
                retire_heads: vec![prev.hash.clone()],
                tombstone_target: Some(target),
            };
        }

        let attach = Resolution {
            chain_id: prev.chain_id.clone(),
            retire_heads: vec![prev.hash.clone()],
            tombstone_target: None,
        };

        // Same author, or a legacy predecessor with no author of record.
        let compatible = match (&prev.author_hash, author) {
            (None, _) => true,
            (Some(prev_author), Some(author)) => prev_author == author,
            (Some(_), None) => false,
        };
        if compatible {
            return attach;
        }

        // An unsigned submission cannot hold cross-author rights.
        let Some(author) = author else {
            debug!(
                hash = %hash.short(),
                prev = %prev.hash.short(),
                "Anonymous update of an authored chain: forked into a new chain"
            );
            return Resolution::new_chain(hash);
        };

        // The agent's operator holds implicit update rights over the
        // agent's chains.
        if let Some(prev_author_block) = prev
            .author_hash
            .as_ref()
            .and_then(|a| self.store.get(a))
        {
            if prev_author_block.block.block_type.starts_with(mechanism::AGENT)
                && prev_author_block.block.ref_values("operator").contains(author)
            {
                return attach;
            }
        }

        // Explicit cross-author approval: authored by the predecessor's
        // author, naming this author as grantee over this chain.
        if self.approval_exists(prev, author) {
            return attach;
        }

        debug!(
            hash = %hash.short(),
            prev = %prev.hash.short(),
            "Cross-author update without approval: forked into a new chain"
        );
        Resolution::new_chain(hash)
    }

    fn approval_exists(&self, prev: &StoredBlock, grantee: &Hash) -> bool {
        let Some(prev_author) = &prev.author_hash else {
            return false;
        };
        self.store
            .by_type(mechanism::APPROVAL, true)
            .into_iter()
            .filter_map(|h| self.store.get(&h))
            .any(|approval| {
                approval.author_hash.as_ref() == Some(prev_author)
                    && approval.block.ref_values("grantee").contains(grantee)
                    && approval.block.state_str("target_chain")
                        == Some(prev.chain_id.as_str())
            })
    }

    fn published_key(&self, author: &Hash) -> Option<Ed25519PublicKey> {
        let actor = self.store.get(author)?;
        let key_hex = actor.block.state_str("public_key")?;
        Ed25519PublicKey::from_hex(key_hex).ok()
    }
}

struct Resolution {
    chain_id: Hash,
    retire_heads: Vec<Hash>,
    tombstone_target: Option<Hash>,
}

impl Resolution {
    fn new_chain(hash: &Hash) -> Self {
        Self {
            chain_id: hash.clone(),
            retire_heads: Vec::new(),
            tombstone_target: None,
        }
    }
}

fn validate_block(block: &Block) -> Result<(), StoreError> {
    if block.block_type.is_empty() {
        return Err(StoreError::BadRequest("missing type".to_string()));
    }
    let len = block.block_type.chars().count();
    if len > fb_types::MAX_TYPE_LEN {
        return Err(StoreError::BadRequest(format!(
            "type too long: {len} chars (max {})",
            fb_types::MAX_TYPE_LEN
        )));
    }
    Ok(())
}

fn derive_visibility(block: &Block) -> Visibility {
    block
        .state_str("visibility")
        .and_then(Visibility::from_hint)
        .unwrap_or_else(|| Visibility::default_for_type(&block.block_type))
}

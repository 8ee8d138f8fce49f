//! The block table and its secondary indexes.
//!
//! `BlockStore` is the storage port; `MemoryStore` is the reference engine.
//! The primary map is the source of truth — every secondary index (type,
//! author, inverted refs, chain heads, insertion order) is rebuildable from
//! it, and `rebuild_indexes` proves that.
//!
//! Head transitions are atomic with the insert: `commit` applies the new
//! record, retires predecessor heads, and rewrites a tombstone target under
//! one write lock, so readers never observe a torn chain.

use crate::errors::StoreError;
use fb_types::{Hash, StoredBlock};
use parking_lot::RwLock;
use serde_json::{json, Map};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Everything `commit` applies atomically: the resolved record plus the head
/// retirements and tombstone rewrite that accompany it.
#[derive(Debug, Clone)]
pub struct InsertPlan {
    /// The record to insert. `created_at` and `sequence` are assigned by the
    /// store at commit time.
    pub record: StoredBlock,
    /// Heads retired by this insert (the attached predecessor, or every
    /// block listed by a merge).
    pub retire_heads: Vec<Hash>,
    /// Tombstone target whose state is rewritten to `{"tombstoned":true}`.
    pub tombstone_target: Option<Hash>,
}

/// The storage port. All mutation goes through `commit`; reads are
/// index-backed lookups the query layer composes.
pub trait BlockStore: Send + Sync {
    /// Fetch by hash.
    fn get(&self, hash: &Hash) -> Option<StoredBlock>;

    /// Existence check.
    fn contains(&self, hash: &Hash) -> bool;

    /// Total stored blocks.
    fn count(&self) -> usize;

    /// Apply an insert plan atomically. Idempotent on hash: committing an
    /// already-stored hash returns the existing record untouched.
    fn commit(&self, plan: InsertPlan) -> Result<StoredBlock, StoreError>;

    /// Hashes of blocks with this exact type, or the type plus dot-nested
    /// subtypes, in insertion order.
    fn by_type(&self, block_type: &str, include_subtypes: bool) -> Vec<Hash>;

    /// Hashes authored by an actor, in insertion order.
    fn by_author(&self, author: &Hash) -> Vec<Hash>;

    /// Reverse ref lookup: every `(role, referrer)` pointing at a target.
    fn referencing(&self, target: &Hash) -> Vec<(String, Hash)>;

    /// Current heads of one chain.
    fn chain_heads(&self, chain_id: &Hash) -> Vec<Hash>;

    /// Every current head.
    fn all_heads(&self) -> Vec<Hash>;

    /// All hashes in insertion order.
    fn all_ordered(&self) -> Vec<Hash>;

    /// Blocks with `sequence >= from`, in insertion order, bounded.
    fn since_sequence(&self, from: u64, limit: usize) -> Vec<StoredBlock>;

    /// Distinct stored types with counts, for discovery.
    fn type_counts(&self) -> Vec<(String, usize)>;

    /// Drop and recompute every secondary index from the primary map.
    fn rebuild_indexes(&self);
}

#[derive(Default)]
struct Inner {
    blocks: HashMap<Hash, StoredBlock>,
    /// Insertion order; position is the sequence number.
    order: Vec<Hash>,
    /// Last assigned timestamp. Insert times are nudged forward on
    /// collision so `created_at` cursors never skip a block.
    last_created_at: i64,
    by_type: HashMap<String, Vec<Hash>>,
    by_author: HashMap<Hash, Vec<Hash>>,
    /// target -> (role, referrer)
    refs_index: HashMap<Hash, Vec<(String, Hash)>>,
    chain_heads: HashMap<Hash, BTreeSet<Hash>>,
}

impl Inner {
    fn index_record(&mut self, record: &StoredBlock) {
        self.by_type
            .entry(record.block.block_type.clone())
            .or_default()
            .push(record.hash.clone());
        if let Some(author) = &record.author_hash {
            self.by_author
                .entry(author.clone())
                .or_default()
                .push(record.hash.clone());
        }
        for (role, target) in record.block.all_refs() {
            self.refs_index
                .entry(target)
                .or_default()
                .push((role, record.hash.clone()));
        }
        if record.is_head {
            self.chain_heads
                .entry(record.chain_id.clone())
                .or_default()
                .insert(record.hash.clone());
        }
    }

    fn retire_head(&mut self, hash: &Hash) {
        let Some(record) = self.blocks.get_mut(hash) else {
            return;
        };
        record.is_head = false;
        let chain_id = record.chain_id.clone();
        if let Some(heads) = self.chain_heads.get_mut(&chain_id) {
            heads.remove(hash);
            if heads.is_empty() {
                self.chain_heads.remove(&chain_id);
            }
        }
    }
}

/// The in-memory reference engine.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl BlockStore for MemoryStore {
    fn get(&self, hash: &Hash) -> Option<StoredBlock> {
        self.inner.read().blocks.get(hash).cloned()
    }

    fn contains(&self, hash: &Hash) -> bool {
        self.inner.read().blocks.contains_key(hash)
    }

    fn count(&self) -> usize {
        self.inner.read().blocks.len()
    }

    fn commit(&self, plan: InsertPlan) -> Result<StoredBlock, StoreError> {
        let mut inner = self.inner.write();

        if let Some(existing) = inner.blocks.get(&plan.record.hash) {
            return Ok(existing.clone());
        }

        let mut record = plan.record;
        record.sequence = inner.order.len() as u64;
        record.created_at = now_millis().max(inner.last_created_at + 1);
        inner.last_created_at = record.created_at;

        for head in &plan.retire_heads {
            inner.retire_head(head);
        }

        inner.order.push(record.hash.clone());
        inner.index_record(&record);
        inner.blocks.insert(record.hash.clone(), record.clone());

        if let Some(target) = &plan.tombstone_target {
            if let Some(victim) = inner.blocks.get_mut(target) {
                let mut erased = Map::new();
                erased.insert("tombstoned".to_string(), json!(true));
                victim.block.state = erased;
                debug!(target = %target.short(), "Block content erased by tombstone");
            }
        }

        debug!(
            hash = %record.hash.short(),
            block_type = %record.block.block_type,
            chain = %record.chain_id.short(),
            "Block committed"
        );
        Ok(record)
    }

    fn by_type(&self, block_type: &str, include_subtypes: bool) -> Vec<Hash> {
        let inner = self.inner.read();
        if !include_subtypes {
            return inner.by_type.get(block_type).cloned().unwrap_or_default();
        }
        let prefix = format!("{block_type}.");
        let mut hashes: Vec<Hash> = inner
            .by_type
            .iter()
            .filter(|(t, _)| *t == block_type || t.starts_with(&prefix))
            .flat_map(|(_, hs)| hs.iter().cloned())
            .collect();
        // Merge of several per-type lists: restore insertion order.
        hashes.sort_by_key(|h| inner.blocks.get(h).map_or(u64::MAX, |b| b.sequence));
        hashes
    }

    fn by_author(&self, author: &Hash) -> Vec<Hash> {
        self.inner
            .read()
            .by_author
            .get(author)
            .cloned()
            .unwrap_or_default()
    }

    fn referencing(&self, target: &Hash) -> Vec<(String, Hash)> {
        self.inner
            .read()
            .refs_index
            .get(target)
            .cloned()
            .unwrap_or_default()
    }

    fn chain_heads(&self, chain_id: &Hash) -> Vec<Hash> {
        self.inner
            .read()
            .chain_heads
            .get(chain_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn all_heads(&self) -> Vec<Hash> {
        let inner = self.inner.read();
        let mut heads: Vec<Hash> = inner
            .chain_heads
            .values()
            .flat_map(|set| set.iter().cloned())
            .collect();
        heads.sort_by_key(|h| inner.blocks.get(h).map_or(u64::MAX, |b| b.sequence));
        heads
    }

    fn all_ordered(&self) -> Vec<Hash> {
        self.inner.read().order.clone()
    }

    fn since_sequence(&self, from: u64, limit: usize) -> Vec<StoredBlock> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .skip(from as usize)
            .take(limit)
            .filter_map(|h| inner.blocks.get(h).cloned())
            .collect()
    }

    fn type_counts(&self) -> Vec<(String, usize)> {
        let inner = self.inner.read();
        let mut counts: Vec<(String, usize)> = inner
            .by_type
            .iter()
            .map(|(t, hs)| (t.clone(), hs.len()))
            .collect();
        counts.sort();
        counts
    }

    fn rebuild_indexes(&self) {
        let mut inner = self.inner.write();
        inner.by_type.clear();
        inner.by_author.clear();
        inner.refs_index.clear();
        inner.chain_heads.clear();

        let order = inner.order.clone();
        for hash in order {
            if let Some(record) = inner.blocks.get(&hash).cloned() {
                inner.index_record(&record);
            }
        }
        debug!(blocks = inner.blocks.len(), "Secondary indexes rebuilt");
    }
}

/// Helper for ref-role lookups composed by the query layer.
pub fn referenced_by_role(store: &dyn BlockStore, target: &Hash, role: &str) -> Vec<Hash> {
    store
        .referencing(target)
        .into_iter()
        .filter(|(r, _)| r == role)
        .map(|(_, h)| h)
        .collect()
}

//! # FoodBlock Store
//!
//! The block graph store and everything that reads it.
//!
//! - `store` — the storage port and the in-memory reference engine with
//!   rebuildable secondary indexes.
//! - `pipeline` — the single writer of record: validation, hash integrity,
//!   author-scoped update resolution, fork detection, tombstone erasure,
//!   visibility derivation, and exactly one `new_block` emission per insert.
//! - `query` — type/ref/heads/time filters, chain and tree walks, reverse
//!   lookups, composable search.
//! - `trust` — the trust projection, parameterized by `observe.trust_policy`
//!   blocks.

pub mod errors;
pub mod pipeline;
pub mod query;
pub mod store;
pub mod trust;

pub use errors::StoreError;
pub use pipeline::{
    BatchItemResult, BatchReport, BatchStatus, BlockSubmission, InsertOutcome, InsertPipeline,
};
pub use query::{
    chain, find, forward, heads, query_blocks, tree, BlocksQuery, FindQuery, FindResult,
    SortOrder, TreeNode, BLOCKS_LIMIT_DEFAULT, BLOCKS_LIMIT_MAX, CHAIN_DEPTH_DEFAULT,
    CHAIN_DEPTH_MAX, FIND_STATE_WHITELIST, TREE_DEPTH_DEFAULT, TREE_DEPTH_MAX,
};
pub use store::{BlockStore, InsertPlan, MemoryStore};
pub use trust::{compute_trust, TrustInputs, TrustPolicy, TrustScore, TrustWeights};

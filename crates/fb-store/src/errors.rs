//! Store and pipeline error types.

use fb_types::{BlockError, Hash};
use thiserror::Error;

/// Errors from the store and insert pipeline.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Malformed submission: missing type, bad JSON shape, oversized type.
    #[error("Invalid block: {0}")]
    BadRequest(String),

    /// Block-level validation failed.
    #[error(transparent)]
    Block(#[from] BlockError),

    /// Supplied hash does not match the recomputed identity.
    #[error("Hash mismatch: supplied {supplied}, computed {computed}")]
    HashMismatch { supplied: Hash, computed: Hash },

    /// Wrapper signature did not verify against the author's published key.
    #[error("Signature verification failed for author {0}")]
    InvalidSignature(Hash),

    /// Lookup target absent.
    #[error("Block not found: {0}")]
    NotFound(Hash),

    /// Underlying storage failure.
    #[error("Storage failure: {0}")]
    Storage(String),
}

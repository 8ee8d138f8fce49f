//! # FoodBlock Types
//!
//! The block data model shared across every subsystem. This is the single
//! source of truth for type definitions: the `{type, state, refs}` triple,
//! the signed wrapper, the stored record with its derived columns, and the
//! shared error vocabulary.
//!
//! A block's identity is `SHA-256(canonical(type, state, refs))`; everything
//! outside those three fields (author, signature, chain bookkeeping,
//! visibility, timestamps) lives on the stored record and never enters the
//! hash.

pub mod block;
pub mod errors;
pub mod hash;
pub mod mechanism;
pub mod stored;

pub use block::{Block, HashedBlock, SignedWrapper};
pub use errors::BlockError;
pub use hash::Hash;
pub use stored::{StoredBlock, Visibility};

/// Canonical-form version label carried on signed wrappers.
pub const PROTOCOL_VERSION: &str = "0.5";

/// Maximum length of a block type in characters.
pub const MAX_TYPE_LEN: usize = 100;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_version() {
        assert_eq!(PROTOCOL_VERSION, "0.5");
    }
}

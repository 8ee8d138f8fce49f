//! Shared error vocabulary for block construction and validation.

use fb_canonical::CanonicalError;
use thiserror::Error;

/// Errors from constructing or validating blocks.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlockError {
    /// `type` missing or not a string.
    #[error("Missing block type")]
    MissingType,

    /// `type` exceeds the 100-character limit.
    #[error("Block type too long: {0} chars (max 100)")]
    TypeTooLong(usize),

    /// A hash string is not 64 lowercase hex characters.
    #[error("Invalid hash: {0}")]
    InvalidHash(String),

    /// `state` or `refs` was not a JSON object.
    #[error("Expected a JSON object for {0}")]
    NotAnObject(&'static str),

    /// Canonical encoding failed.
    #[error("Canonical encoding failed: {0}")]
    Canonical(#[from] CanonicalError),
}

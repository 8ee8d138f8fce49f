//! Canonical encoding error types.

use thiserror::Error;

/// Errors from canonical serialization.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CanonicalError {
    /// Two distinct keys normalized to the same NFC form.
    #[error("Duplicate object key after NFC normalization: {0}")]
    DuplicateKey(String),

    /// A number outside the representable range (NaN / Infinity).
    #[error("Non-finite numbers are not representable")]
    NonFiniteNumber,
}

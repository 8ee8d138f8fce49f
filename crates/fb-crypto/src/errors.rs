//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Signature bytes malformed (not 64 hex-decodable bytes)
    #[error("Invalid signature format")]
    InvalidSignatureFormat,

    /// Invalid public key
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Invalid private key
    #[error("Invalid private key")]
    InvalidPrivateKey,

    /// Envelope structure malformed
    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// The holder's key is not in the recipient set
    #[error("Not a recipient of this envelope")]
    NotARecipient,

    /// Canonical encoding failed while building a signing payload
    #[error("Canonical encoding failed: {0}")]
    Canonical(#[from] fb_canonical::CanonicalError),

    /// Block-level validation failed while building a signing payload
    #[error(transparent)]
    Block(#[from] fb_types::BlockError),
}

impl From<hex::FromHexError> for CryptoError {
    fn from(_: hex::FromHexError) -> Self {
        CryptoError::InvalidEnvelope("bad hex".to_string())
    }
}

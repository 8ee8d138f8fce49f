//! Federation error types.

use thiserror::Error;

/// Errors from federation operations. Per-peer failures are logged and
/// surfaced in responses; they never take the server down.
#[derive(Debug, Error)]
pub enum FederationError {
    /// Outbound HTTP failed after retries.
    #[error("Peer unreachable: {0}")]
    PeerUnreachable(String),

    /// A peer returned a non-success status.
    #[error("Peer returned {status}: {body}")]
    PeerRejected { status: u16, body: String },

    /// Transport signature verification failed.
    #[error("Federation signature verification failed")]
    InvalidSignature,

    /// Malformed request or response payload.
    #[error("Bad federation payload: {0}")]
    BadPayload(String),

    /// Local store failure while serving an exchange.
    #[error(transparent)]
    Store(#[from] fb_store::StoreError),

    /// Crypto failure while signing or verifying.
    #[error(transparent)]
    Crypto(#[from] fb_crypto::CryptoError),

    /// Canonical encoding failure while building a signing payload.
    #[error(transparent)]
    Canonical(#[from] fb_canonical::CanonicalError),
}

impl From<reqwest::Error> for FederationError {
    fn from(e: reqwest::Error) -> Self {
        FederationError::PeerUnreachable(e.to_string())
    }
}

//! Agent runtime error types.

use fb_types::Hash;
use thiserror::Error;

/// Permission gate and lifecycle failures. `kind()` is the machine-readable
/// error kind carried on 403/429 responses.
#[derive(Debug, Error)]
pub enum AgentError {
    /// `refs.agent` does not resolve to a stored block.
    #[error("Unknown agent: {0}")]
    UnknownAgent(Hash),

    /// The referenced block is not an `actor.agent`.
    #[error("Block {0} is not an agent")]
    NotAnAgent(Hash),

    /// No declared capability matches the block type.
    #[error("Agent lacks capability for type {block_type}")]
    CapabilityDenied { block_type: String },

    /// Monetary value exceeds the agent's ceiling.
    #[error("Amount {amount} exceeds agent max_amount {max}")]
    AmountExceeded { amount: f64, max: f64 },

    /// The rolling one-hour window is full.
    #[error("Agent rate limit reached: {limit} blocks per hour")]
    RateLimited { limit: u64 },

    /// A lifecycle transition targeted a non-draft or terminal block.
    #[error("Not an open draft: {0}")]
    NotADraft(Hash),

    /// Underlying store failure.
    #[error(transparent)]
    Store(#[from] fb_store::StoreError),

    /// Block construction failure while emitting a lifecycle block.
    #[error(transparent)]
    Block(#[from] fb_types::BlockError),
}

impl AgentError {
    /// Machine-readable kind for error envelopes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownAgent(_) => "unknown_agent",
            Self::NotAnAgent(_) => "not_an_agent",
            Self::CapabilityDenied { .. } => "capability_denied",
            Self::AmountExceeded { .. } => "amount_exceeded",
            Self::RateLimited { .. } => "rate_limited",
            Self::NotADraft(_) => "not_a_draft",
            Self::Store(_) => "storage",
            Self::Block(_) => "bad_request",
        }
    }
}

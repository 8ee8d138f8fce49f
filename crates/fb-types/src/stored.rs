//! The stored record: a block plus its derived columns.

use crate::block::Block;
use crate::hash::Hash;
use serde::{Deserialize, Serialize};

/// Who can see a block. Stored in a dedicated column, never in the hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Network,
    Sector,
    Chain,
    Direct,
    Private,
    Internal,
    Deleted,
}

impl Visibility {
    /// Parse a `state.visibility` hint.
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint {
            "public" => Some(Self::Public),
            "network" => Some(Self::Network),
            "sector" => Some(Self::Sector),
            "chain" => Some(Self::Chain),
            "direct" => Some(Self::Direct),
            "private" => Some(Self::Private),
            "internal" => Some(Self::Internal),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }

    /// Type-based default when no hint is present.
    pub fn default_for_type(block_type: &str) -> Self {
        if block_type.starts_with("transfer.payment") || block_type.starts_with("transfer.subscription")
        {
            Self::Direct
        } else if block_type.starts_with("observe.reading") {
            Self::Network
        } else if block_type.starts_with("actor.agent") {
            Self::Internal
        } else {
            Self::Public
        }
    }
}

/// A block as persisted: the hash-covered triple plus derived columns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredBlock {
    /// Primary identity.
    pub hash: Hash,

    /// The hash-covered triple, flattened to `type`/`state`/`refs` on the
    /// wire.
    #[serde(flatten)]
    pub block: Block,

    /// Hash of the signing actor block, when the insert was wrapped.
    pub author_hash: Option<Hash>,

    /// Hex Ed25519 signature over the canonical form.
    pub signature: Option<String>,

    /// Canonical-form version label.
    pub protocol_version: String,

    /// Genesis hash of the update chain this block belongs to.
    pub chain_id: Hash,

    /// True iff this is the latest accepted successor of `chain_id`.
    pub is_head: bool,

    pub visibility: Visibility,

    /// Server insert time, unix milliseconds.
    pub created_at: i64,

    /// Process-wide insertion order; drives cursors and event ordering.
    pub sequence: u64,
}

impl StoredBlock {
    /// Type accessor, for dispatch sites.
    pub fn block_type(&self) -> &str {
        &self.block.block_type
    }
}

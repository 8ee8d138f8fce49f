//! The block triple and its constructors.

use crate::errors::BlockError;
use crate::hash::Hash;
use crate::mechanism::is_event_type;
use crate::MAX_TYPE_LEN;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A block is exactly three fields. Identity is the SHA-256 of the canonical
/// serialization of the triple; nothing else is hash-covered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Dot-notation type, at most 100 characters.
    #[serde(rename = "type")]
    pub block_type: String,

    /// Arbitrary JSON object. `_`-prefixed keys may carry encryption
    /// envelopes; arrays preserve declared order.
    #[serde(default)]
    pub state: Map<String, Value>,

    /// Role → hash or sorted hash array. Set semantics in canonical form.
    #[serde(default)]
    pub refs: Map<String, Value>,
}

impl Block {
    /// Build a block, validating the type and injecting `instance_id` for
    /// event types that lack one. Two otherwise-identical events must not
    /// collapse into a single hash.
    pub fn create(
        block_type: impl Into<String>,
        state: Map<String, Value>,
        refs: Map<String, Value>,
    ) -> Result<HashedBlock, BlockError> {
        let block_type = block_type.into();
        if block_type.is_empty() {
            return Err(BlockError::MissingType);
        }
        let len = block_type.chars().count();
        if len > MAX_TYPE_LEN {
            return Err(BlockError::TypeTooLong(len));
        }

        let mut state = state;
        if is_event_type(&block_type) && !state.contains_key("instance_id") {
            state.insert(
                "instance_id".to_string(),
                Value::String(Uuid::new_v4().to_string()),
            );
        }

        let block = Block {
            block_type,
            state,
            refs,
        };
        let hash = block.hash()?;
        Ok(HashedBlock { hash, block })
    }

    /// Build a successor block: `create` with `refs.updates = prev`.
    pub fn update(
        prev: &Hash,
        block_type: impl Into<String>,
        state: Map<String, Value>,
        mut refs: Map<String, Value>,
    ) -> Result<HashedBlock, BlockError> {
        refs.insert(
            "updates".to_string(),
            Value::String(prev.as_str().to_string()),
        );
        Self::create(block_type, state, refs)
    }

    /// Compute this block's identity.
    pub fn hash(&self) -> Result<Hash, BlockError> {
        let hex = fb_canonical::hash_block(&self.block_type, &self.state, &self.refs)?;
        Hash::new(hex)
    }

    /// Canonical serialization, the signing payload.
    pub fn canonical(&self) -> Result<String, BlockError> {
        Ok(fb_canonical::canonical(
            &self.block_type,
            &self.state,
            &self.refs,
        )?)
    }

    /// The predecessor in this block's update chain, if any.
    pub fn updates_ref(&self) -> Option<Hash> {
        self.refs
            .get("updates")
            .and_then(Value::as_str)
            .and_then(|s| Hash::new(s).ok())
    }

    /// All hashes in a ref role (a role holds one hash or an array).
    pub fn ref_values(&self, role: &str) -> Vec<Hash> {
        match self.refs.get(role) {
            Some(Value::String(s)) => Hash::new(s.as_str()).into_iter().collect(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .filter_map(|s| Hash::new(s).ok())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Every (role, hash) pair across all ref roles.
    pub fn all_refs(&self) -> Vec<(String, Hash)> {
        let mut out = Vec::new();
        for role in self.refs.keys() {
            for hash in self.ref_values(role) {
                out.push((role.clone(), hash));
            }
        }
        out
    }

    /// Monetary value heuristic: the first of `total` / `amount` / `value`
    /// present as a number.
    pub fn amount(&self) -> Option<f64> {
        ["total", "amount", "value"]
            .iter()
            .find_map(|key| self.state.get(*key).and_then(Value::as_f64))
    }

    /// A string field from `state`.
    pub fn state_str(&self, key: &str) -> Option<&str> {
        self.state.get(key).and_then(Value::as_str)
    }
}

/// A block together with its computed identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HashedBlock {
    pub hash: Hash,
    #[serde(flatten)]
    pub block: Block,
}

/// The authentication wrapper: an Ed25519 signature over the canonical form
/// of the inner block, attributed to the actor block identified by
/// `author_hash`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignedWrapper {
    pub foodblock: Block,
    pub author_hash: Hash,
    /// Hex-encoded 64-byte Ed25519 signature.
    pub signature: String,
    pub protocol_version: String,
}

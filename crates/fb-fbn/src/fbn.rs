//! The FBN text form and `fb://` URIs.
//!
//! FBN renders a block as one line a human can read and a parser can take
//! back exactly:
//!
//! ```text
//! substance.product {"name":"Sourdough","price":4.5} -> {"seller":"ab…"}
//! ```
//!
//! `parse_fbn(format_block(b))` reproduces `b` up to canonical equivalence.

use crate::errors::FbnError;
use fb_types::{Block, Hash, StoredBlock};
use serde_json::Value;

/// Render a block as FBN text.
pub fn format_block(block: &Block) -> String {
    let state = Value::Object(block.state.clone()).to_string();
    if block.refs.is_empty() {
        format!("{} {}", block.block_type, state)
    } else {
        let refs = Value::Object(block.refs.clone()).to_string();
        format!("{} {} -> {}", block.block_type, state, refs)
    }
}

/// Parse FBN text back into a block.
pub fn parse_fbn(text: &str) -> Result<Block, FbnError> {
    let trimmed = text.trim();
    let (block_type, rest) = trimmed
        .split_once(' ')
        .ok_or_else(|| FbnError::MalformedFbn("expected `type state`".to_string()))?;

    let (state_text, refs_text) = match rest.split_once(" -> ") {
        Some((state, refs)) => (state, Some(refs)),
        None => (rest, None),
    };

    let state = serde_json::from_str::<Value>(state_text)
        .ok()
        .and_then(|v| v.as_object().cloned())
        .ok_or_else(|| FbnError::MalformedFbn("state is not a JSON object".to_string()))?;

    let refs = match refs_text {
        None => serde_json::Map::new(),
        Some(text) => serde_json::from_str::<Value>(text)
            .ok()
            .and_then(|v| v.as_object().cloned())
            .ok_or_else(|| FbnError::MalformedFbn("refs is not a JSON object".to_string()))?,
    };

    Ok(Block {
        block_type: block_type.to_string(),
        state,
        refs,
    })
}

/// `fb://<hash>`.
pub fn to_uri(hash: &Hash) -> String {
    format!("fb://{hash}")
}

/// Parse `fb://<hash>` back to a hash.
pub fn from_uri(uri: &str) -> Result<Hash, FbnError> {
    let raw = uri
        .strip_prefix("fb://")
        .ok_or_else(|| FbnError::MalformedUri(uri.to_string()))?;
    Hash::new(raw).map_err(|_| FbnError::MalformedUri(uri.to_string()))
}

/// A one-paragraph human description of a stored block.
pub fn explain(record: &StoredBlock) -> String {
    let mut out = format!(
        "{} {} — {} of chain {}",
        record.block.block_type,
        record.hash.short(),
        if record.is_head { "head" } else { "superseded member" },
        record.chain_id.short(),
    );

    if let Some(author) = &record.author_hash {
        out.push_str(&format!(", authored by {}", author.short()));
    }

    let fields: Vec<String> = record
        .block
        .state
        .iter()
        .filter(|(k, _)| !k.starts_with('_'))
        .take(6)
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    if !fields.is_empty() {
        out.push_str(&format!(". State: {}", fields.join(", ")));
    }

    let refs: Vec<String> = record
        .block
        .all_refs()
        .iter()
        .map(|(role, hash)| format!("{role}→{}", hash.short()))
        .collect();
    if !refs.is_empty() {
        out.push_str(&format!(". Refs: {}", refs.join(", ")));
    }
    out.push('.');
    out
}

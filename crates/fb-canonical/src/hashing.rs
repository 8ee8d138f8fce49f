//! SHA-256 content hashing.

use crate::encoder::canonical;
use crate::errors::CanonicalError;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Hash arbitrary bytes, rendered as 64 lowercase hex chars.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute a block's identity: `SHA-256(canonical(type, state, refs))`.
pub fn hash_block(
    block_type: &str,
    state: &Map<String, Value>,
    refs: &Map<String, Value>,
) -> Result<String, CanonicalError> {
    let encoded = canonical(block_type, state, refs)?;
    Ok(sha256_hex(encoded.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sha256_known_vector() {
        // SHA-256("abc")
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hash_is_lowercase_hex() {
        let state = json!({"name": "Sourdough"}).as_object().unwrap().clone();
        let h = hash_block("substance.product", &state, &serde_json::Map::new()).unwrap();
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_hash_deterministic() {
        let a = json!({"price": 4.5, "name": "Rye"}).as_object().unwrap().clone();
        let b = json!({"name": "Rye", "price": 4.5}).as_object().unwrap().clone();
        let ha = hash_block("substance.product", &a, &serde_json::Map::new()).unwrap();
        let hb = hash_block("substance.product", &b, &serde_json::Map::new()).unwrap();
        assert_eq!(ha, hb);
    }
}

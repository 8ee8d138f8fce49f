//! Cross-language vector fixture.
//!
//! Every implementation of the protocol must reproduce every hash in
//! `fixtures/vectors.json` exactly. The fixture is shared across SDKs; a
//! mismatch here means the encoder diverged from the protocol, not that the
//! fixture is wrong.

use crate::hashing::hash_block;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Deserialize)]
struct Fixture {
    count: usize,
    vectors: Vec<Vector>,
}

#[derive(Deserialize)]
struct Vector {
    name: String,
    #[serde(rename = "type")]
    block_type: String,
    state: Map<String, Value>,
    refs: Map<String, Value>,
    hash: String,
}

fn load() -> Fixture {
    serde_json::from_str(include_str!("../fixtures/vectors.json"))
        .expect("fixture file parses")
}

#[test]
fn test_fixture_is_large_enough() {
    let fixture = load();
    assert!(fixture.count >= 124, "fixture shrank to {}", fixture.count);
    assert_eq!(fixture.count, fixture.vectors.len());
}

#[test]
fn test_every_vector_hash_matches() {
    let fixture = load();
    for v in &fixture.vectors {
        let computed = hash_block(&v.block_type, &v.state, &v.refs)
            .unwrap_or_else(|e| panic!("vector {} failed to encode: {e}", v.name));
        assert_eq!(
            computed, v.hash,
            "vector {} hash mismatch (type {})",
            v.name, v.block_type
        );
    }
}

#[test]
fn test_nfc_forms_collapse() {
    let fixture = load();
    let find = |name: &str| {
        fixture
            .vectors
            .iter()
            .find(|v| v.name == name)
            .unwrap_or_else(|| panic!("missing vector {name}"))
    };
    assert_eq!(find("nfc_precomposed").hash, find("nfc_decomposed").hash);
    assert_eq!(
        find("nfc_key_precomposed").hash,
        find("nfc_key_decomposed").hash
    );
}

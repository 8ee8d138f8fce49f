//! Cross-crate invariants: identity, signatures, batch permutation
//! stability, envelope recipients.

use crate::support::{obj, Node};
use fb_bus::EventPublisher;
use fb_crypto::{
    decrypt_value, encrypt_value, sign_block, verify_wrapper, EncryptionKeyPair, SigningKeyPair,
};
use fb_types::{Block, Hash};
use rand::seq::SliceRandom;
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;

#[tokio::test]
async fn stored_hash_always_matches_recomputation() {
    let node = Node::new();
    for i in 0..25 {
        let block = Block::create(
            "observe.note",
            obj(json!({"instance_id": format!("n{i}"), "value": i})),
            Map::new(),
        )
        .unwrap();
        node.bare(block.block).await;
    }

    for hash in node.store.all_ordered() {
        let record = node.store.get(&hash).unwrap();
        assert_eq!(record.block.hash().unwrap(), record.hash);
    }
}

#[test]
fn single_bit_mutation_breaks_verification() {
    let key = SigningKeyPair::generate();
    let author = Hash::new("a".repeat(64)).unwrap();
    let block = Block::create(
        "transfer.order",
        obj(json!({"instance_id": "fixed", "total": 10.0})),
        Map::new(),
    )
    .unwrap()
    .block;

    let wrapper = sign_block(&block, author, &key).unwrap();
    assert!(verify_wrapper(&wrapper, &key.public_key()).is_ok());

    // State, type, and refs mutations each invalidate the signature.
    let mut tampered = wrapper.clone();
    tampered.foodblock.state.insert("total".to_string(), json!(10.000001));
    assert!(verify_wrapper(&tampered, &key.public_key()).is_err());

    let mut tampered = wrapper.clone();
    tampered.foodblock.block_type.push('x');
    assert!(verify_wrapper(&tampered, &key.public_key()).is_err());

    let mut tampered = wrapper;
    tampered
        .foodblock
        .refs
        .insert("buyer".to_string(), json!("b".repeat(64)));
    assert!(verify_wrapper(&tampered, &key.public_key()).is_err());
}

#[tokio::test]
async fn batch_permutations_produce_the_same_head_set() {
    // A chain of four updates plus an unrelated block, inserted in several
    // shuffled orders: every permutation must land on the same head set.
    let genesis = Block::create("substance.product", obj(json!({"v": 0})), Map::new()).unwrap();
    let mut blocks = vec![genesis.clone()];
    let mut prev = genesis.hash.clone();
    for i in 1..=3 {
        let next =
            Block::update(&prev, "substance.product", obj(json!({"v": i})), Map::new()).unwrap();
        prev = next.hash.clone();
        blocks.push(next);
    }
    blocks.push(Block::create("actor.business", obj(json!({"name": "Mill"})), Map::new()).unwrap());

    let mut reference_heads: Option<BTreeSet<Hash>> = None;
    let mut rng = rand::thread_rng();

    for _ in 0..6 {
        let node = Node::new();
        let mut shuffled: Vec<Value> = blocks
            .iter()
            .map(|b| serde_json::to_value(&b.block).unwrap())
            .collect();
        shuffled.shuffle(&mut rng);

        let report = node.pipeline.insert_batch(shuffled).await;
        assert_eq!(report.inserted, blocks.len());
        assert_eq!(report.failed, 0);

        let heads: BTreeSet<Hash> = node.store.all_heads().into_iter().collect();
        match &reference_heads {
            None => reference_heads = Some(heads),
            Some(reference) => assert_eq!(&heads, reference),
        }
    }
}

#[test]
fn envelope_recipients_and_only_recipients_decrypt() {
    let recipients: Vec<EncryptionKeyPair> =
        (0..4).map(|_| EncryptionKeyPair::generate()).collect();
    let outsider = EncryptionKeyPair::generate();
    let publics: Vec<_> = recipients.iter().map(|r| r.public_key()).collect();

    let value = json!({"terms": {"net": 30, "discount": 0.02}});
    let envelope = encrypt_value(&value, &publics).unwrap();

    for recipient in &recipients {
        assert_eq!(decrypt_value(&envelope, recipient).unwrap(), value);
    }
    assert!(decrypt_value(&envelope, &outsider).is_err());
}

#[tokio::test]
async fn no_duplicate_events_for_duplicate_inserts() {
    let node = Node::new();
    let block = Block::create("substance.product", obj(json!({"v": 1})), Map::new()).unwrap();

    node.bare(block.block.clone()).await;
    let after_first = node.bus.events_published();

    let second = node
        .pipeline
        .insert(fb_store::BlockSubmission::bare(block.block))
        .await
        .unwrap();
    assert!(second.exists);
    assert_eq!(node.bus.events_published(), after_first);
}

#[test]
fn canonical_is_idempotent_over_reparse() {
    let state = obj(json!({"name": "héllo", "n": 200.0, "list": [3, 1, 2]}));
    let refs = obj(json!({"inputs": ["ff".repeat(32), "00".repeat(32)]}));

    let first = fb_canonical::canonical("transform", &state, &refs).unwrap();
    let reparsed: Value = serde_json::from_str(&first).unwrap();
    let second = fb_canonical::canonical(
        "transform",
        reparsed["state"].as_object().unwrap(),
        reparsed["refs"].as_object().unwrap(),
    )
    .unwrap();
    assert_eq!(first, second);
}

//! Chain scenarios: genesis/update, fork, approval, tombstone, merge.

use crate::support::{obj, Node};
use fb_crypto::SigningKeyPair;
use fb_store::{query, BlockStore};
use fb_types::{mechanism, Block};
use serde_json::{json, Map};

#[tokio::test]
async fn genesis_and_update_by_same_author() {
    let node = Node::new();
    let key = SigningKeyPair::generate();
    let author = node.actor(&key, "X").await;

    let a = Block::create(
        "substance.product",
        obj(json!({"name": "Sourdough", "price": 4.5})),
        Map::new(),
    )
    .unwrap();
    let a_stored = node.signed(&a.block, author.clone(), &key).await;

    let b = Block::update(
        &a_stored.hash,
        "substance.product",
        obj(json!({"name": "Sourdough", "price": 5.0})),
        Map::new(),
    )
    .unwrap();
    let b_stored = node.signed(&b.block, author, &key).await;

    assert_eq!(b_stored.block.updates_ref(), Some(a_stored.hash.clone()));
    assert!(b_stored.is_head);
    assert_eq!(b_stored.chain_id, a_stored.hash);
    assert!(!node.store.get(&a_stored.hash).unwrap().is_head);

    // /chain/B returns [B, A].
    let walk = query::chain(node.store.as_ref(), &b_stored.hash, None);
    assert_eq!(walk.len(), 2);
    assert_eq!(walk[0].hash, b_stored.hash);
    assert_eq!(walk[1].hash, a_stored.hash);
}

#[tokio::test]
async fn cross_author_update_without_approval_forks() {
    let node = Node::new();
    let key_x = SigningKeyPair::generate();
    let key_y = SigningKeyPair::generate();
    let x = node.actor(&key_x, "X").await;
    let y = node.actor(&key_y, "Y").await;

    let a = Block::create("substance.product", obj(json!({"v": 1})), Map::new()).unwrap();
    let a_stored = node.signed(&a.block, x, &key_x).await;

    let b = Block::update(
        &a_stored.hash,
        "substance.product",
        obj(json!({"v": 2})),
        Map::new(),
    )
    .unwrap();
    let b_stored = node.signed(&b.block, y, &key_y).await;

    // Both heads stand; no error surfaced anywhere.
    assert!(node.store.get(&a_stored.hash).unwrap().is_head);
    assert!(b_stored.is_head);
    assert_eq!(b_stored.chain_id, b_stored.hash);
    assert_ne!(b_stored.chain_id, a_stored.chain_id);
}

#[tokio::test]
async fn approved_cross_author_update_attaches() {
    let node = Node::new();
    let key_x = SigningKeyPair::generate();
    let key_y = SigningKeyPair::generate();
    let x = node.actor(&key_x, "X").await;
    let y = node.actor(&key_y, "Y").await;

    let a = Block::create("substance.product", obj(json!({"v": 1})), Map::new()).unwrap();
    let a_stored = node.signed(&a.block, x.clone(), &key_x).await;

    let approval = Block::create(
        mechanism::APPROVAL,
        obj(json!({"target_chain": a_stored.chain_id.as_str()})),
        obj(json!({"grantee": y.as_str()})),
    )
    .unwrap();
    node.signed(&approval.block, x, &key_x).await;

    let b = Block::update(
        &a_stored.hash,
        "substance.product",
        obj(json!({"v": 2})),
        Map::new(),
    )
    .unwrap();
    let b_stored = node.signed(&b.block, y, &key_y).await;

    assert_eq!(b_stored.chain_id, a_stored.hash);
    assert!(b_stored.is_head);
    assert!(!node.store.get(&a_stored.hash).unwrap().is_head);
}

#[tokio::test]
async fn tombstone_erases_content_preserves_identity() {
    let node = Node::new();
    let key = SigningKeyPair::generate();
    let x = node.actor(&key, "X").await;

    let a = Block::create(
        "substance.product",
        obj(json!({"name": "Sourdough", "price": 4.5})),
        Map::new(),
    )
    .unwrap();
    let a_stored = node.signed(&a.block, x.clone(), &key).await;

    // A downstream reference to A.
    let order = Block::create(
        "transfer.order",
        obj(json!({"total": 9.0})),
        obj(json!({"product": a_stored.hash.as_str()})),
    )
    .unwrap();
    node.bare(order.block).await;

    let t = Block::create(
        mechanism::TOMBSTONE,
        obj(json!({"reason": "gdpr_erasure", "requested_by": x.as_str()})),
        obj(json!({"target": a_stored.hash.as_str(), "updates": a_stored.hash.as_str()})),
    )
    .unwrap();
    let t_stored = node.bare(t.block).await;

    let erased = node.store.get(&a_stored.hash).unwrap();
    assert_eq!(erased.block.state, obj(json!({"tombstoned": true})));
    assert_eq!(erased.hash, a_stored.hash);
    assert_eq!(erased.block.block_type, "substance.product");
    assert_eq!(erased.block.refs, a_stored.block.refs);

    assert!(t_stored.is_head);
    assert_eq!(t_stored.chain_id, a_stored.chain_id);

    // Downstream refs to A still resolve.
    let referencing = node.store.referencing(&a_stored.hash);
    assert!(referencing.iter().any(|(role, _)| role == "product"));
}

#[tokio::test]
async fn merge_unifies_two_chains() {
    let node = Node::new();
    let a = node
        .bare(
            Block::create("substance.product", obj(json!({"site": "a"})), Map::new())
                .unwrap()
                .block,
        )
        .await;
    let b = node
        .bare(
            Block::create("substance.product", obj(json!({"site": "b"})), Map::new())
                .unwrap()
                .block,
        )
        .await;

    let merge = Block::create(
        mechanism::MERGE,
        obj(json!({"strategy": "union"})),
        obj(json!({"merges": [a.hash.as_str(), b.hash.as_str()]})),
    )
    .unwrap();
    let merged = node.bare(merge.block).await;

    assert!(merged.is_head);
    assert!(!node.store.get(&a.hash).unwrap().is_head);
    assert!(!node.store.get(&b.hash).unwrap().is_head);

    // Subsequent updates follow normal rules from the merge block.
    let next = Block::update(
        &merged.hash,
        "substance.product",
        obj(json!({"site": "both"})),
        Map::new(),
    )
    .unwrap();
    let next_stored = node.bare(next.block).await;
    assert_eq!(next_stored.chain_id, merged.chain_id);
    assert!(!node.store.get(&merged.hash).unwrap().is_head);
}

#[tokio::test]
async fn chain_walk_reaches_genesis_in_chain_length_steps() {
    let node = Node::new();
    let genesis = node
        .bare(
            Block::create("observe.note", obj(json!({"i": 0})), Map::new())
                .unwrap()
                .block,
        )
        .await;

    let mut prev = genesis.hash.clone();
    for i in 1..20 {
        let next = Block::update(&prev, "observe.note", obj(json!({"i": i})), Map::new()).unwrap();
        prev = node.bare(next.block).await.hash;
    }

    let walk = query::chain(node.store.as_ref(), &prev, None);
    assert_eq!(walk.len(), 20);
    assert_eq!(walk.last().unwrap().hash, genesis.hash);
}

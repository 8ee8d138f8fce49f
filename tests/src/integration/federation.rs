//! Federation round trips at the exchange layer: two nodes, handshake,
//! push, pull with cursor.

use crate::support::{obj, Node};
use fb_federation::exchange::{
    build_handshake, exchange_value, handle_handshake, handle_pull, handle_push, push_payload,
    PullRequest, PushRequest,
};
use fb_federation::{PeerRegistry, ServerIdentity};
use fb_types::Block;
use serde_json::{json, Map};

fn identity(name: &str) -> ServerIdentity {
    ServerIdentity::from_config(name, format!("https://{name}.example"), None).unwrap()
}

#[tokio::test]
async fn handshake_then_push_then_pull_round_trip() {
    let node_a = Node::new();
    let node_b = Node::new();
    let alice = identity("node-a");
    let bob = identity("node-b");
    let bob_peers = PeerRegistry::new();

    // A handshakes with B.
    let request = build_handshake(&alice).unwrap();
    let ack = handle_handshake(&bob, &bob_peers, &request).unwrap();
    assert!(ack.ok);
    assert_eq!(bob_peers.len(), 1);

    // A creates X and Y (Y updates X), then pushes both to B.
    let x = Block::create("substance.product", obj(json!({"v": 1})), Map::new()).unwrap();
    let x_stored = node_a.bare(x.block).await;
    let y = Block::update(
        &x_stored.hash,
        "substance.product",
        obj(json!({"v": 2})),
        Map::new(),
    )
    .unwrap();
    let y_stored = node_a.bare(y.block).await;

    let blocks = vec![
        exchange_value(&x_stored),
        exchange_value(&y_stored),
    ];
    let push = PushRequest {
        peer_url: Some(alice.url.clone()),
        public_key: Some(alice.public_key_hex()),
        signature: Some(alice.sign_value(&push_payload(&alice.url, &blocks)).unwrap()),
        blocks,
    };
    let (response, _) = handle_push(&node_b.pipeline, push).await.unwrap();
    assert_eq!(response.inserted, 2);
    assert_eq!(response.skipped, 0);
    assert_eq!(response.failed, 0);

    // B now resolves the chain exactly as A does.
    let y_on_b = node_b.store.get(&y_stored.hash).unwrap();
    assert_eq!(y_on_b.chain_id, x_stored.hash);
    assert!(y_on_b.is_head);

    // B pulls from its own store since t0: both blocks, insertion order.
    let page = handle_pull(node_b.store.as_ref(), &PullRequest::default()).unwrap();
    assert_eq!(page.count, 2);
    assert_eq!(page.blocks[0].hash, x_stored.hash);
    assert_eq!(page.blocks[1].hash, y_stored.hash);
    assert!(!page.has_more);

    // Pulling again with the returned cursor drains to empty.
    let drained = handle_pull(
        node_b.store.as_ref(),
        &PullRequest {
            since: page.cursor,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(drained.count, 0);
    assert!(!drained.has_more);
}

#[tokio::test]
async fn push_is_idempotent_across_repeats() {
    let node_a = Node::new();
    let node_b = Node::new();

    let x = Block::create("substance.product", obj(json!({"v": 1})), Map::new()).unwrap();
    let x_stored = node_a.bare(x.block).await;

    let blocks = vec![exchange_value(&x_stored)];
    for round in 0..2 {
        let push = PushRequest {
            peer_url: None,
            public_key: None,
            signature: None,
            blocks: blocks.clone(),
        };
        let (response, _) = handle_push(&node_b.pipeline, push).await.unwrap();
        if round == 0 {
            assert_eq!(response.inserted, 1);
        } else {
            assert_eq!(response.inserted, 0);
            assert_eq!(response.skipped, 1);
        }
    }
    assert_eq!(node_b.store.count(), 1);
}

#[tokio::test]
async fn pushed_signed_blocks_survive_reverification() {
    let node_a = Node::new();
    let node_b = Node::new();
    let key = fb_crypto::SigningKeyPair::generate();

    // The actor (with its published key) and a signed product travel
    // together; B verifies the product signature against the actor block it
    // just inserted.
    let author = node_a.actor(&key, "X").await;
    let product = Block::create("substance.product", obj(json!({"v": 1})), Map::new()).unwrap();
    let product_stored = node_a.signed(&product.block, author.clone(), &key).await;

    let actor_stored = node_a.store.get(&author).unwrap();
    let push = PushRequest {
        peer_url: None,
        public_key: None,
        signature: None,
        blocks: vec![
            exchange_value(&actor_stored),
            exchange_value(&product_stored),
        ],
    };
    let (response, _) = handle_push(&node_b.pipeline, push).await.unwrap();
    assert_eq!(response.inserted, 2);

    let on_b = node_b.store.get(&product_stored.hash).unwrap();
    assert_eq!(on_b.author_hash, Some(author));
    assert!(on_b.signature.is_some());
}

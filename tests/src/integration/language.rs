//! The NL entry end to end: sentence -> blocks -> batch insert -> graph.

use crate::support::Node;
use fb_fbn::{fb, format_block, from_uri, parse_fbn, to_uri};
use fb_store::query;
use serde_json::{json, Value};

#[tokio::test]
async fn bakery_sentence_lands_as_linked_graph() {
    let node = Node::new();

    let result = fb("Joe's Bakery sells Sourdough for £4.50 organic").unwrap();
    assert_eq!(result.blocks.len(), 2);
    assert!(result.confidence >= 0.6);

    let values: Vec<Value> = result
        .blocks
        .iter()
        .map(|b| serde_json::to_value(&b.block).unwrap())
        .collect();
    let report = node.pipeline.insert_batch(values).await;
    assert_eq!(report.inserted, 2);
    assert_eq!(report.failed, 0);

    // The product is the primary and references the venue.
    let product = node.store.get(&result.primary).unwrap();
    assert_eq!(product.block.block_type, "substance.product");
    assert_eq!(product.block.state["name"], json!("Sourdough"));
    assert_eq!(product.block.state["price"], json!(4.5));
    assert_eq!(product.block.state["currency"], json!("GBP"));
    assert_eq!(product.block.state["organic"], json!(true));

    let venue_hash = product.block.ref_values("seller").pop().unwrap();
    let venue = node.store.get(&venue_hash).unwrap();
    assert_eq!(venue.block.block_type, "actor.venue");
    assert_eq!(venue.block.state["name"], json!("Joe's Bakery"));

    // The forward index links the venue back to its product.
    let sellers = query::forward(node.store.as_ref(), &venue_hash, None, Some("seller"));
    assert_eq!(sellers.len(), 1);
    assert_eq!(sellers[0].hash, result.primary);
}

#[tokio::test]
async fn fbn_and_uri_round_trips_against_the_store() {
    let node = Node::new();
    let result = fb("Hillside Farm grows Heritage Wheat").unwrap();
    let values: Vec<Value> = result
        .blocks
        .iter()
        .map(|b| serde_json::to_value(&b.block).unwrap())
        .collect();
    node.pipeline.insert_batch(values).await;

    let stored = node.store.get(&result.primary).unwrap();

    // parse(format(b)) reproduces the stored identity.
    let text = format_block(&stored.block);
    let reparsed = parse_fbn(&text).unwrap();
    assert_eq!(reparsed.hash().unwrap(), stored.hash);

    // fromURI(toURI(b)) == {hash}.
    let uri = to_uri(&stored.hash);
    assert_eq!(from_uri(&uri).unwrap(), stored.hash);
}

//! Agent lifecycle through the bus: drafts, auto-approval, gate denials.

use crate::support::{obj, Node};
use fb_agent::{AgentError, DraftService, PermissionGate};
use fb_bus::{spawn_dispatcher, EventFilter, HandlerRegistry, TypePattern};
use fb_store::BlockStore;
use fb_types::{Block, Hash};
use serde_json::{json, Map};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

async fn make_agent(node: &Node, state: serde_json::Value) -> Hash {
    node.bare(
        Block::create("actor.agent", obj(state), Map::new())
            .unwrap()
            .block,
    )
    .await
    .hash
}

#[tokio::test]
async fn draft_auto_approves_through_the_bus() {
    let node = Node::new();
    let agent = make_agent(
        &node,
        json!({
            "capabilities": ["transfer.*"],
            "max_amount": 500.0,
            "auto_approve_under": 50.0
        }),
    )
    .await;

    // Wire the draft service the way the node runtime does.
    let mut registry = HandlerRegistry::new();
    registry.register(
        vec![TypePattern::new("*")],
        Arc::new(DraftService::new(node.pipeline.clone())),
    );
    let _dispatcher = spawn_dispatcher(&node.bus, Arc::new(registry));

    let mut confirmations = node.bus.subscribe(EventFilter::for_type("transfer.order"));

    let draft = Block::create(
        "transfer.order",
        obj(json!({"total": 42.0, "draft": true})),
        obj(json!({"agent": agent.as_str()})),
    )
    .unwrap();
    let draft_stored = node.bare(draft.block).await;

    // First event: the draft itself. Second: the confirmed block.
    let first = timeout(Duration::from_secs(1), confirmations.recv())
        .await
        .expect("draft event")
        .unwrap();
    assert_eq!(first.block.hash, draft_stored.hash);

    let second = timeout(Duration::from_secs(1), confirmations.recv())
        .await
        .expect("confirmation event")
        .unwrap();
    let confirmed = &second.block;

    assert_eq!(confirmed.block.updates_ref(), Some(draft_stored.hash.clone()));
    assert_eq!(confirmed.block.ref_values("approved_agent"), vec![agent]);
    assert!(!confirmed.block.state.contains_key("draft"));
    assert!(confirmed.is_head);
    assert!(!node.store.get(&draft_stored.hash).unwrap().is_head);
}

#[tokio::test]
async fn gate_denies_capability_amount_and_rate() {
    let node = Node::new();
    let gate = PermissionGate::new(node.store.clone());
    let now = chrono_now();

    let agent = make_agent(
        &node,
        json!({
            "capabilities": ["transfer.*"],
            "max_amount": 100.0,
            "rate_limit_per_hour": 2
        }),
    )
    .await;

    // Capability.
    let outside = Block::create("actor.business", Map::new(), Map::new())
        .unwrap()
        .block;
    assert!(matches!(
        gate.check(&outside, &agent, now),
        Err(AgentError::CapabilityDenied { .. })
    ));

    // Amount.
    let too_big = Block::create("transfer.order", obj(json!({"total": 250.0})), Map::new())
        .unwrap()
        .block;
    assert!(matches!(
        gate.check(&too_big, &agent, now),
        Err(AgentError::AmountExceeded { .. })
    ));

    // Rate: fill the window, then the next check trips.
    for i in 0..2 {
        let filler = Block::create(
            "transfer.order",
            obj(json!({"instance_id": format!("f{i}"), "total": 1.0})),
            obj(json!({"agent": agent.as_str()})),
        )
        .unwrap();
        node.bare(filler.block).await;
    }
    let third = Block::create("transfer.order", obj(json!({"total": 1.0})), Map::new())
        .unwrap()
        .block;
    assert!(matches!(
        gate.check(&third, &agent, now),
        Err(AgentError::RateLimited { limit: 2 })
    ));
}

#[tokio::test]
async fn operator_update_of_agent_chain_attaches() {
    let node = Node::new();
    let operator_key = fb_crypto::SigningKeyPair::generate();
    let operator = node.actor(&operator_key, "Operator").await;
    let agent_key = fb_crypto::SigningKeyPair::generate();

    // The agent actor, operated by the human actor.
    let agent_block = Block::create(
        "actor.agent",
        obj(json!({
            "capabilities": ["transfer.*"],
            "public_key": agent_key.public_key().to_hex()
        })),
        obj(json!({"operator": operator.as_str()})),
    )
    .unwrap();
    let agent = node.bare(agent_block.block).await.hash;

    // A draft signed by the agent itself.
    let draft = Block::create(
        "transfer.order",
        obj(json!({"total": 900.0, "draft": true})),
        obj(json!({"agent": agent.as_str()})),
    )
    .unwrap();
    let draft_stored = node.signed(&draft.block, agent.clone(), &agent_key).await;

    // The operator approves: an update signed with the operator key
    // attaches to the agent-authored chain without an explicit approval
    // block.
    let approved = fb_agent::lifecycle::approval_block(&draft_stored, &agent).unwrap();
    let approved_stored = node
        .signed(&approved.block, operator, &operator_key)
        .await;

    assert_eq!(approved_stored.chain_id, draft_stored.chain_id);
    assert!(approved_stored.is_head);
    assert!(!node.store.get(&draft_stored.hash).unwrap().is_head);
}

fn chrono_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock after epoch")
        .as_millis() as i64
}

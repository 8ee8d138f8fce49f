//! The trust projection.
//!
//! A read-side score computed from the graph, parameterized by an
//! `observe.trust_policy` block or defaults. Never stored in block state.

use crate::store::BlockStore;
use fb_types::{mechanism, Hash, StoredBlock};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

/// Scoring weights. Defaults follow the protocol reference values.
#[derive(Debug, Clone, Serialize)]
pub struct TrustWeights {
    pub authority: f64,
    pub reviews: f64,
    pub depth: f64,
    pub orders: f64,
    pub age: f64,
}

impl Default for TrustWeights {
    fn default() -> Self {
        Self {
            authority: 3.0,
            reviews: 1.0,
            depth: 2.0,
            orders: 1.5,
            age: 0.5,
        }
    }
}

/// Policy: weights, recognized certification authorities, and the reviewer
/// connection-density cutoff.
#[derive(Debug, Clone)]
pub struct TrustPolicy {
    pub weights: TrustWeights,
    /// Actor hashes whose certifications count. Empty recognizes any
    /// non-self certifier.
    pub authorities: Vec<Hash>,
    /// A reviewer with more than this many blocks referencing the subject is
    /// considered connection-dense and excluded.
    pub reviewer_density_limit: usize,
}

impl Default for TrustPolicy {
    fn default() -> Self {
        Self {
            weights: TrustWeights::default(),
            authorities: Vec::new(),
            reviewer_density_limit: 10,
        }
    }
}

impl TrustPolicy {
    /// Read a policy out of an `observe.trust_policy` block; missing fields
    /// keep their defaults.
    pub fn from_block(record: &StoredBlock) -> Self {
        let mut policy = Self::default();
        if let Some(weights) = record.block.state.get("weights").and_then(Value::as_object) {
            let read = |key: &str, fallback: f64| {
                weights.get(key).and_then(Value::as_f64).unwrap_or(fallback)
            };
            policy.weights = TrustWeights {
                authority: read("authority", policy.weights.authority),
                reviews: read("reviews", policy.weights.reviews),
                depth: read("depth", policy.weights.depth),
                orders: read("orders", policy.weights.orders),
                age: read("age", policy.weights.age),
            };
        }
        if let Some(authorities) = record.block.state.get("authorities").and_then(Value::as_array) {
            policy.authorities = authorities
                .iter()
                .filter_map(Value::as_str)
                .filter_map(|s| Hash::new(s).ok())
                .collect();
        }
        if let Some(limit) = record
            .block
            .state
            .get("reviewer_density_limit")
            .and_then(Value::as_u64)
        {
            policy.reviewer_density_limit = limit as usize;
        }
        policy
    }

    /// The current policy head in the store, or defaults.
    pub fn current(store: &dyn BlockStore) -> Self {
        store
            .by_type(mechanism::TRUST_POLICY, false)
            .into_iter()
            .filter_map(|h| store.get(&h))
            .filter(|b| b.is_head)
            .last()
            .map(|b| Self::from_block(&b))
            .unwrap_or_default()
    }
}

/// The measured inputs, exposed alongside the score.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrustInputs {
    pub valid_authority_certs: u64,
    /// Sum of `rating/5` over included reviews.
    pub independent_peer_reviews: f64,
    pub effective_chain_depth: u64,
    pub verified_order_count: u64,
    pub account_age_days: u64,
}

/// The projection result.
#[derive(Debug, Clone, Serialize)]
pub struct TrustScore {
    pub actor: Hash,
    pub score: f64,
    pub inputs: TrustInputs,
}

/// Compute the trust projection for an actor.
///
/// Exclusions (self-reviews, connection-dense reviewers, expired or
/// unrecognized certifications) are applied before any weighting.
pub fn compute_trust(
    store: &dyn BlockStore,
    actor: &Hash,
    policy: &TrustPolicy,
    now_ms: i64,
) -> TrustScore {
    let mut inputs = TrustInputs::default();

    let referencing: Vec<StoredBlock> = store
        .referencing(actor)
        .into_iter()
        .map(|(_, h)| h)
        .collect::<HashSet<_>>()
        .into_iter()
        .filter_map(|h| store.get(&h))
        .collect();

    for record in &referencing {
        let block_type = record.block_type();
        if type_is(block_type, mechanism::CERTIFICATION) {
            if certification_counts(record, actor, policy, now_ms) {
                inputs.valid_authority_certs += 1;
            }
        } else if type_is(block_type, mechanism::REVIEW) {
            if let Some(weight) = review_weight(store, record, actor, policy) {
                inputs.independent_peer_reviews += weight;
            }
        } else if type_is(block_type, "transfer.order") && order_is_verified(store, record) {
            inputs.verified_order_count += 1;
        }
    }

    inputs.effective_chain_depth = chain_depth(store, actor);
    inputs.account_age_days = account_age_days(store, actor, now_ms);

    // Uniform weight-times-input scheme; the 365-day cap already bounds
    // the age term.
    let w = &policy.weights;
    let score = w.authority * inputs.valid_authority_certs as f64
        + w.reviews * inputs.independent_peer_reviews
        + w.depth * inputs.effective_chain_depth as f64
        + w.orders * inputs.verified_order_count as f64
        + w.age * inputs.account_age_days as f64;

    TrustScore {
        actor: actor.clone(),
        score,
        inputs,
    }
}

fn type_is(block_type: &str, family: &str) -> bool {
    block_type == family
        || block_type
            .strip_prefix(family)
            .is_some_and(|rest| rest.starts_with('.'))
}

fn certification_counts(
    record: &StoredBlock,
    subject: &Hash,
    policy: &TrustPolicy,
    now_ms: i64,
) -> bool {
    // Self-certification never counts.
    if record.author_hash.as_ref() == Some(subject) {
        return false;
    }
    // Authority recognition.
    if !policy.authorities.is_empty() {
        match &record.author_hash {
            Some(author) if policy.authorities.contains(author) => {}
            _ => return false,
        }
    }
    // Still valid.
    match record.block.state.get("valid_until") {
        Some(Value::Number(n)) => n.as_i64().map(|t| t > now_ms).unwrap_or(false),
        Some(Value::String(s)) => chrono::DateTime::parse_from_rfc3339(s)
            .map(|t| t.timestamp_millis() > now_ms)
            .unwrap_or(false),
        _ => false,
    }
}

fn review_weight(
    store: &dyn BlockStore,
    record: &StoredBlock,
    subject: &Hash,
    policy: &TrustPolicy,
) -> Option<f64> {
    let reviewer = record.author_hash.as_ref()?;
    // Self-reviews are excluded.
    if reviewer == subject {
        return None;
    }
    // Connection-density exclusion: reviewers whose output is saturated
    // with links to the subject look like a clique, not a peer.
    let links_to_subject = store
        .by_author(reviewer)
        .into_iter()
        .filter_map(|h| store.get(&h))
        .filter(|b| b.block.all_refs().iter().any(|(_, h)| h == subject))
        .count();
    if links_to_subject > policy.reviewer_density_limit {
        return None;
    }

    let rating = record
        .block
        .state
        .get("rating")
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
        .clamp(0.0, 5.0);
    Some(rating / 5.0)
}

fn order_is_verified(store: &dyn BlockStore, record: &StoredBlock) -> bool {
    let Some(adapter_ref) = record
        .block
        .state_str("adapter_ref")
        .and_then(|s| Hash::new(s).ok())
    else {
        return false;
    };
    store
        .get(&adapter_ref)
        .map(|anchor| type_is(anchor.block_type(), "actor.processor"))
        .unwrap_or(false)
}

/// Distinct authors across the actor's outgoing provenance: the authors of
/// every block reachable through refs from the blocks this actor authored.
///
/// The ref graph is acyclic by construction (refs point at prior hashes),
/// but the walk still keeps a visited set so shared ancestry is expanded
/// once.
fn chain_depth(store: &dyn BlockStore, actor: &Hash) -> u64 {
    let mut authors = HashSet::new();
    let mut visited: HashSet<Hash> = HashSet::new();
    let mut frontier: Vec<Hash> = Vec::new();

    for hash in store.by_author(actor) {
        let Some(record) = store.get(&hash) else { continue };
        for (_, target) in record.block.all_refs() {
            if visited.insert(target.clone()) {
                frontier.push(target);
            }
        }
    }

    while let Some(hash) = frontier.pop() {
        let Some(record) = store.get(&hash) else { continue };
        if let Some(author) = &record.author_hash {
            if author != actor {
                authors.insert(author.clone());
            }
        }
        for (_, target) in record.block.all_refs() {
            if visited.insert(target.clone()) {
                frontier.push(target);
            }
        }
    }
    authors.len() as u64
}

fn account_age_days(store: &dyn BlockStore, actor: &Hash, now_ms: i64) -> u64 {
    let Some(record) = store.get(actor) else { return 0 };
    let genesis_at = store
        .get(&record.chain_id)
        .map(|g| g.created_at)
        .unwrap_or(record.created_at);
    let days = (now_ms - genesis_at).max(0) / 86_400_000;
    (days as u64).min(365)
}

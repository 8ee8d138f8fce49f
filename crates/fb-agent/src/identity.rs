//! Agent identity: the current head of an `actor.agent` chain.

use crate::errors::AgentError;
use fb_store::BlockStore;
use fb_types::{Hash, StoredBlock};
use serde_json::Value;

/// The declared limits of an agent, read from the head of its chain.
///
/// Checks read the head, not the submitted genesis: an operator tightening
/// `max_amount` takes effect on the next check. Check-and-use is eventually
/// consistent by design.
#[derive(Debug, Clone)]
pub struct AgentProfile {
    /// The hash used in `refs.agent` (the agent's genesis identity).
    pub hash: Hash,
    pub name: Option<String>,
    pub capabilities: Vec<String>,
    pub max_amount: Option<f64>,
    pub rate_limit_per_hour: Option<u64>,
    pub auto_approve_under: Option<f64>,
    pub operator: Option<Hash>,
}

impl AgentProfile {
    /// Load the agent's current head and read its limits.
    pub fn load(store: &dyn BlockStore, agent_hash: &Hash) -> Result<Self, AgentError> {
        let record = store
            .get(agent_hash)
            .ok_or_else(|| AgentError::UnknownAgent(agent_hash.clone()))?;
        if !record.block.block_type.starts_with(fb_types::mechanism::AGENT) {
            return Err(AgentError::NotAnAgent(agent_hash.clone()));
        }

        let head = current_head(store, &record).unwrap_or(record);
        Ok(Self::from_record(agent_hash.clone(), &head))
    }

    fn from_record(hash: Hash, head: &StoredBlock) -> Self {
        let state = &head.block.state;
        Self {
            hash,
            name: state.get("name").and_then(Value::as_str).map(String::from),
            capabilities: state
                .get("capabilities")
                .and_then(Value::as_array)
                .map(|caps| {
                    caps.iter()
                        .filter_map(Value::as_str)
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            max_amount: state.get("max_amount").and_then(Value::as_f64),
            rate_limit_per_hour: state.get("rate_limit_per_hour").and_then(Value::as_u64),
            auto_approve_under: state.get("auto_approve_under").and_then(Value::as_f64),
            operator: head.block.ref_values("operator").into_iter().next(),
        }
    }
}

fn current_head(store: &dyn BlockStore, record: &StoredBlock) -> Option<StoredBlock> {
    store
        .chain_heads(&record.chain_id)
        .into_iter()
        .filter_map(|h| store.get(&h))
        .max_by_key(|b| b.sequence)
}

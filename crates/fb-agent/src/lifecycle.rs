//! The draft/approve lifecycle.
//!
//! Every transition is an ordinary update block, so the approval trail lives
//! in the graph:
//!
//! ```text
//! draft ──> auto_approved          (system, amount under threshold)
//!      ──> approved                (operator signs the confirming update)
//!      ──> rejected                (operator signs a rejecting update)
//!      ──> superseded              (a newer draft replaces it)
//! ```
//!
//! Terminal states are immutable by construction: the confirming or
//! rejecting block is the new head, and the draft is no longer one.

use crate::errors::AgentError;
use crate::identity::AgentProfile;
use async_trait::async_trait;
use fb_bus::BlockHandler;
use fb_store::{BlockSubmission, InsertPipeline};
use fb_types::{Block, Hash, HashedBlock, StoredBlock};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Whether a stored block is an open agent draft.
pub fn is_draft(block: &StoredBlock) -> bool {
    block
        .block
        .state
        .get("draft")
        .and_then(Value::as_bool)
        .unwrap_or(false)
        && !block.block.ref_values("agent").is_empty()
}

/// Build the confirming update: same type, state without the draft marker,
/// refs plus `approved_agent`.
pub fn approval_block(draft: &StoredBlock, agent_hash: &Hash) -> Result<HashedBlock, AgentError> {
    let mut state = draft.block.state.clone();
    state.remove("draft");
    // A fresh occurrence, not a copy of the draft's.
    state.remove("instance_id");

    let mut refs = draft.block.refs.clone();
    refs.insert(
        "approved_agent".to_string(),
        Value::String(agent_hash.as_str().to_string()),
    );

    Ok(Block::update(
        &draft.hash,
        draft.block.block_type.clone(),
        state,
        refs,
    )?)
}

/// Build the rejecting update: the draft stays in the graph; the rejection
/// becomes the head of its chain.
pub fn rejection_block(draft: &StoredBlock, reason: &str) -> Result<HashedBlock, AgentError> {
    let mut state = Map::new();
    state.insert("status".to_string(), json!("rejected"));
    state.insert("reason".to_string(), json!(reason));

    Ok(Block::update(
        &draft.hash,
        draft.block.block_type.clone(),
        state,
        draft.block.refs.clone(),
    )?)
}

/// Watches `new_block` for agent drafts and auto-approves the ones under the
/// agent's threshold. Registered on the bus at startup; the confirming block
/// re-enters the normal pipeline.
pub struct DraftService {
    pipeline: Arc<InsertPipeline>,
}

impl DraftService {
    pub fn new(pipeline: Arc<InsertPipeline>) -> Self {
        Self { pipeline }
    }

    /// Decide and, if eligible, emit the auto-approval for a stored draft.
    ///
    /// Eligible when the draft's amount is under `auto_approve_under`, or
    /// when it carries no amount and the threshold is positive.
    pub async fn process(&self, draft: &StoredBlock) -> Result<Option<StoredBlock>, AgentError> {
        if !is_draft(draft) {
            return Ok(None);
        }
        let agent_hash = draft
            .block
            .ref_values("agent")
            .into_iter()
            .next()
            .expect("is_draft guarantees refs.agent");

        let profile = AgentProfile::load(self.pipeline.store().as_ref(), &agent_hash)?;
        let Some(threshold) = profile.auto_approve_under else {
            debug!(draft = %draft.hash.short(), "No auto-approve threshold, awaiting operator");
            return Ok(None);
        };

        let eligible = match draft.block.amount() {
            Some(amount) => amount < threshold,
            None => threshold > 0.0,
        };
        if !eligible {
            debug!(
                draft = %draft.hash.short(),
                "Draft above auto-approve threshold, awaiting operator"
            );
            return Ok(None);
        }

        let confirmed = approval_block(draft, &agent_hash)?;
        // Attributed to the draft's author so the update attaches to the
        // draft's chain; the system holds no key of its own.
        let submission = BlockSubmission {
            block: confirmed.block,
            author_hash: draft.author_hash.clone(),
            signature: None,
            supplied_hash: None,
        };
        let outcome = self.pipeline.insert(submission).await?;

        info!(
            draft = %draft.hash.short(),
            confirmed = %outcome.block.hash.short(),
            agent = %agent_hash.short(),
            "Draft auto-approved"
        );
        Ok(Some(outcome.block))
    }
}

#[async_trait]
impl BlockHandler for DraftService {
    fn name(&self) -> &str {
        "agent-drafts"
    }

    async fn handle(&self, block: Arc<StoredBlock>) {
        if let Err(e) = self.process(&block).await {
            warn!(hash = %block.hash.short(), error = %e, "Draft processing failed");
        }
    }
}

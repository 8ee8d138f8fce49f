//! The three-layer permission gate.
//!
//! Runs before any agent-authored block is accepted, in order: capability,
//! amount, rate. The rate window is computed from the graph via the inverted
//! refs index, so it survives restarts and needs no side table.

use crate::errors::AgentError;
use crate::identity::AgentProfile;
use fb_bus::TypePattern;
use fb_store::BlockStore;
use fb_types::{Block, Hash};
use std::sync::Arc;
use tracing::debug;

const HOUR_MS: i64 = 3_600_000;

/// The permission gate over a store.
pub struct PermissionGate {
    store: Arc<dyn BlockStore>,
}

impl PermissionGate {
    pub fn new(store: Arc<dyn BlockStore>) -> Self {
        Self { store }
    }

    /// Check a block an agent wants to create. `now_ms` anchors the rolling
    /// rate window.
    pub fn check(&self, block: &Block, agent_hash: &Hash, now_ms: i64) -> Result<(), AgentError> {
        let profile = AgentProfile::load(self.store.as_ref(), agent_hash)?;

        self.check_capability(&profile, block)?;
        self.check_amount(&profile, block)?;
        self.check_rate(&profile, now_ms)?;

        debug!(agent = %agent_hash.short(), block_type = %block.block_type, "Agent gate passed");
        Ok(())
    }

    fn check_capability(&self, profile: &AgentProfile, block: &Block) -> Result<(), AgentError> {
        let allowed = profile
            .capabilities
            .iter()
            .any(|cap| TypePattern::new(cap.as_str()).matches(&block.block_type));
        if allowed {
            Ok(())
        } else {
            Err(AgentError::CapabilityDenied {
                block_type: block.block_type.clone(),
            })
        }
    }

    fn check_amount(&self, profile: &AgentProfile, block: &Block) -> Result<(), AgentError> {
        let (Some(amount), Some(max)) = (block.amount(), profile.max_amount) else {
            return Ok(());
        };
        if amount > max {
            return Err(AgentError::AmountExceeded { amount, max });
        }
        Ok(())
    }

    fn check_rate(&self, profile: &AgentProfile, now_ms: i64) -> Result<(), AgentError> {
        let Some(limit) = profile.rate_limit_per_hour else {
            return Ok(());
        };
        let window_start = now_ms - HOUR_MS;
        let created: u64 = self
            .store
            .referencing(&profile.hash)
            .into_iter()
            .filter(|(role, _)| role == "agent")
            .filter_map(|(_, h)| self.store.get(&h))
            .filter(|b| b.created_at > window_start)
            .count() as u64;

        if created >= limit {
            return Err(AgentError::RateLimited { limit });
        }
        Ok(())
    }
}

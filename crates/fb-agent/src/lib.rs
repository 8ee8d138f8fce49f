//! # FoodBlock Agent Runtime
//!
//! Agents are `actor.agent` blocks acting on behalf of an operator under
//! declared limits. Before any agent-authored block is accepted, the
//! permission gate checks three layers in order: capability patterns,
//! monetary amount, and a rolling one-hour rate window computed from the
//! graph.
//!
//! The draft/approve lifecycle is pure graph: a draft is a block with
//! `state.draft = true`; approval, rejection, and auto-approval are ordinary
//! update blocks, so the whole trail is content-addressed and auditable.

pub mod errors;
pub mod gate;
pub mod identity;
pub mod lifecycle;

pub use errors::AgentError;
pub use gate::PermissionGate;
pub use identity::AgentProfile;
pub use lifecycle::DraftService;

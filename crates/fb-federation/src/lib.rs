//! # FoodBlock Federation
//!
//! Server-to-server exchange. Discovery publishes a signed document at
//! `/.well-known/foodblock`; peers register through a signed handshake; and
//! blocks move by push, pull with a cursor, or a composite sync.
//!
//! Authenticity is two-layer: the transport is defended by Ed25519
//! signatures over canonical payloads, and every block re-verifies locally
//! by content hash regardless of which peer delivered it.

pub mod client;
pub mod discovery;
pub mod errors;
pub mod exchange;
pub mod identity;
pub mod peers;
pub mod sync;

pub use client::FederationClient;
pub use discovery::{build_discovery, verify_discovery, DiscoveryDocument};
pub use errors::FederationError;
pub use exchange::{
    build_handshake, exchange_value, handle_handshake, handle_pull, handle_push, push_payload,
    HandshakeAck, HandshakeRequest, PullRequest, PullResponse, PushRequest, PushResponse,
    PULL_LIMIT_DEFAULT, PULL_LIMIT_MAX,
};
pub use identity::ServerIdentity;
pub use peers::{Peer, PeerRegistry};
pub use sync::{spawn_sync_task, sync_with_peer, SyncReport};

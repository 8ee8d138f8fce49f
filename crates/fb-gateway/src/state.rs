//! Shared application state.

use crate::config::GatewayConfig;
use fb_agent::PermissionGate;
use fb_bus::InMemoryEventBus;
use fb_federation::{PeerRegistry, ServerIdentity};
use fb_store::{BlockStore, InsertPipeline};
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

/// Everything handlers need, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BlockStore>,
    pub pipeline: Arc<InsertPipeline>,
    pub bus: Arc<InMemoryEventBus>,
    pub gate: Arc<PermissionGate>,
    pub identity: Arc<ServerIdentity>,
    pub peers: Arc<PeerRegistry>,
    pub config: Arc<GatewayConfig>,
    /// Live SSE connections, bounded by `config.max_sse_connections`.
    pub sse_connections: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(
        pipeline: Arc<InsertPipeline>,
        identity: Arc<ServerIdentity>,
        peers: Arc<PeerRegistry>,
        config: GatewayConfig,
    ) -> Self {
        let store = Arc::clone(pipeline.store());
        let bus = Arc::clone(pipeline.bus());
        let gate = Arc::new(PermissionGate::new(Arc::clone(&store)));
        Self {
            store,
            pipeline,
            bus,
            gate,
            identity,
            peers,
            config: Arc::new(config),
            sse_connections: Arc::new(AtomicUsize::new(0)),
        }
    }
}

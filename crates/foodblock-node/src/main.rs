//! # FoodBlock Node Runtime
//!
//! The reference server entry point. Wires the in-memory store, the event
//! bus and its handler dispatcher, the agent draft service, the federation
//! layer, and the HTTP gateway, then serves until ctrl-c.

mod config;

use anyhow::{anyhow, Result};
use config::NodeConfig;
use fb_agent::DraftService;
use fb_bus::{spawn_dispatcher, HandlerRegistry, InMemoryEventBus, TypePattern};
use fb_federation::{
    exchange::build_handshake, spawn_sync_task, FederationClient, PeerRegistry, ServerIdentity,
};
use fb_gateway::{AppState, GatewayConfig, GatewayService};
use fb_store::{InsertPipeline, MemoryStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const SYNC_INTERVAL: Duration = Duration::from_secs(60);

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::from_env().map_err(|e| anyhow!(e))?;
    init_tracing(&config.log_level);

    info!(name = %config.server_name, port = config.port, "Starting FoodBlock node");
    if config.database_url.is_some() {
        warn!("DATABASE_URL is set but this build runs the in-memory reference engine");
    }
    if config.agent_master_key.is_some() {
        info!("AGENT_MASTER_KEY configured for server-side agent key envelopes");
    }

    // The store and the single event source.
    let store = Arc::new(MemoryStore::new());
    let bus = Arc::new(InMemoryEventBus::new());
    let pipeline = Arc::new(InsertPipeline::new(store.clone(), bus.clone()));

    // Federation identity and peers.
    let identity = Arc::new(
        ServerIdentity::from_config(
            config.server_name.clone(),
            config.server_url.clone(),
            config.federation_private_key.as_deref(),
        )
        .map_err(|e| anyhow!("federation identity: {e}"))?,
    );
    if let Some(expected) = &config.federation_public_key {
        if expected != &identity.public_key_hex() {
            warn!(
                "FEDERATION_PUBLIC_KEY does not match the key derived from \
                 FEDERATION_PRIVATE_KEY; publishing the derived key"
            );
        }
    }

    let peers = Arc::new(PeerRegistry::new());
    for peer in &config.peers {
        peers.upsert(peer, None, None, 0);
    }

    // Event handlers: the agent draft service watches everything, since a
    // draft can be any type.
    let mut registry = HandlerRegistry::new();
    registry.register(
        vec![TypePattern::new("*")],
        Arc::new(DraftService::new(pipeline.clone())),
    );
    let _dispatcher = spawn_dispatcher(&bus, Arc::new(registry));

    // Handshake with configured peers, then sync periodically.
    let client = Arc::new(FederationClient::new().map_err(|e| anyhow!("http client: {e}"))?);
    if !config.peers.is_empty() {
        let handshake_client = client.clone();
        let handshake_identity = identity.clone();
        let peer_urls = config.peers.clone();
        tokio::spawn(async move {
            for peer in peer_urls {
                match build_handshake(&handshake_identity) {
                    Ok(request) => match handshake_client.handshake(&peer, &request).await {
                        Ok(ack) => info!(peer = %peer, name = %ack.name, "Handshake accepted"),
                        Err(e) => warn!(peer = %peer, error = %e, "Handshake failed"),
                    },
                    Err(e) => warn!(error = %e, "Could not build handshake"),
                }
            }
        });
        let _sync = spawn_sync_task(
            client.clone(),
            identity.clone(),
            pipeline.clone(),
            peers.clone(),
            SYNC_INTERVAL,
        );
    }

    // The HTTP surface.
    let gateway_config = GatewayConfig {
        port: config.port,
        base_path: config.base_path.clone(),
        rate_limit_disabled: config.test_mode,
        ..GatewayConfig::default()
    };
    let state = AppState::new(pipeline, identity, peers, gateway_config);
    let service = GatewayService::new(state).map_err(|e| anyhow!("gateway config: {e}"))?;

    service
        .serve(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down gracefully...");
        })
        .await?;

    Ok(())
}

//! Composite sync: pull from a peer, insert locally, push what we authored
//! since the last sync.

use crate::client::FederationClient;
use crate::errors::FederationError;
use crate::exchange::{exchange_value, push_payload, PullRequest, PushRequest, PushResponse};
use crate::identity::ServerIdentity;
use crate::peers::PeerRegistry;
use fb_store::InsertPipeline;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// What one sync round did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub pulled: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub pushed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_result: Option<PushResponse>,
}

/// Run one sync round against a peer.
pub async fn sync_with_peer(
    client: &FederationClient,
    identity: &ServerIdentity,
    pipeline: &InsertPipeline,
    registry: &PeerRegistry,
    peer_url: &str,
) -> Result<SyncReport, FederationError> {
    let peer = registry.get(peer_url);
    let mut report = SyncReport::default();

    // Pull: everything the peer saw since our cursor.
    let mut since = peer.as_ref().and_then(|p| p.last_sync);
    loop {
        let page = client
            .pull(
                peer_url,
                &PullRequest {
                    since,
                    ..Default::default()
                },
            )
            .await?;
        report.pulled += page.count;

        if page.count > 0 {
            let values: Vec<serde_json::Value> =
                page.blocks.iter().map(exchange_value).collect();
            let batch = pipeline.insert_batch(values).await;
            report.inserted += batch.inserted;
            report.skipped += batch.skipped;
        }

        since = page.cursor.or(since);
        if !page.has_more {
            break;
        }
    }

    // Push: local blocks stored since what this peer already has.
    let pushed_sequence = peer.map(|p| p.pushed_sequence).unwrap_or(0);
    let local = pipeline
        .store()
        .since_sequence(pushed_sequence, crate::exchange::PULL_LIMIT_MAX);
    let next_sequence = local
        .last()
        .map(|b| b.sequence + 1)
        .unwrap_or(pushed_sequence);

    if !local.is_empty() {
        let blocks: Vec<serde_json::Value> = local.iter().map(exchange_value).collect();
        let payload = push_payload(&identity.url, &blocks);
        let signature = identity.sign_value(&payload)?;
        let response = client
            .push(
                peer_url,
                &PushRequest {
                    peer_url: Some(identity.url.clone()),
                    public_key: Some(identity.public_key_hex()),
                    signature: Some(signature),
                    blocks,
                },
            )
            .await?;
        report.pushed = local.len();
        report.push_result = Some(response);
    }

    let now = chrono::Utc::now().timestamp_millis();
    registry.record_sync(peer_url, since.unwrap_or(now), next_sequence);

    info!(
        peer = peer_url,
        pulled = report.pulled,
        inserted = report.inserted,
        pushed = report.pushed,
        "Sync round finished"
    );
    Ok(report)
}

/// Periodic sync over every registered peer. One peer failing never stops
/// the round.
pub fn spawn_sync_task(
    client: Arc<FederationClient>,
    identity: Arc<ServerIdentity>,
    pipeline: Arc<InsertPipeline>,
    registry: Arc<PeerRegistry>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            for peer_url in registry.urls() {
                if let Err(e) =
                    sync_with_peer(&client, &identity, &pipeline, &registry, &peer_url).await
                {
                    warn!(peer = %peer_url, error = %e, "Peer sync failed");
                }
            }
        }
    })
}

//! Handshake, push, and pull: the server-side exchange handlers.

use crate::errors::FederationError;
use crate::identity::{verify_value, ServerIdentity};
use crate::peers::PeerRegistry;
use fb_store::{BatchReport, BlockStore, InsertPipeline};
use fb_types::{Hash, StoredBlock, Visibility};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

/// Pull limit bounds.
pub const PULL_LIMIT_MAX: usize = 5000;
pub const PULL_LIMIT_DEFAULT: usize = 500;

/// `POST /.well-known/foodblock/handshake` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeRequest {
    pub peer_url: String,
    pub peer_name: String,
    pub public_key: String,
    /// Hex Ed25519 signature over the canonical form of `payload`.
    pub signature: String,
    pub payload: Value,
}

/// Signed acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeAck {
    pub ok: bool,
    pub name: String,
    pub public_key: String,
    pub signature: String,
    pub payload: Value,
}

/// Verify a handshake and register the peer.
pub fn handle_handshake(
    identity: &ServerIdentity,
    registry: &PeerRegistry,
    request: &HandshakeRequest,
) -> Result<HandshakeAck, FederationError> {
    verify_value(&request.payload, &request.signature, &request.public_key)?;

    let now = chrono::Utc::now().timestamp_millis();
    registry.upsert(
        &request.peer_url,
        Some(request.peer_name.clone()),
        Some(request.public_key.clone()),
        now,
    );
    info!(peer = %request.peer_url, name = %request.peer_name, "Peer registered via handshake");

    let payload = json!({
        "accepted": request.peer_url,
        "server": identity.name,
    });
    let signature = identity.sign_value(&payload)?;
    Ok(HandshakeAck {
        ok: true,
        name: identity.name.clone(),
        public_key: identity.public_key_hex(),
        signature,
        payload,
    })
}

/// Build an outbound handshake request.
pub fn build_handshake(identity: &ServerIdentity) -> Result<HandshakeRequest, FederationError> {
    let payload = json!({
        "peer_url": identity.url,
        "peer_name": identity.name,
    });
    let signature = identity.sign_value(&payload)?;
    Ok(HandshakeRequest {
        peer_url: identity.url.clone(),
        peer_name: identity.name.clone(),
        public_key: identity.public_key_hex(),
        signature,
        payload,
    })
}

/// `POST /.well-known/foodblock/push` request. Signature is optional; when
/// present it covers `{peer_url, block_count, block_hashes}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    pub blocks: Vec<Value>,
}

/// Push outcome, per the standard batch report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushResponse {
    pub inserted: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl From<&BatchReport> for PushResponse {
    fn from(report: &BatchReport) -> Self {
        Self {
            inserted: report.inserted,
            skipped: report.skipped,
            failed: report.failed,
        }
    }
}

/// The transport-level payload a signed push covers.
pub fn push_payload(peer_url: &str, blocks: &[Value]) -> Value {
    let hashes: Vec<String> = blocks
        .iter()
        .filter_map(block_hash_of)
        .collect();
    json!({
        "peer_url": peer_url,
        "block_count": blocks.len(),
        "block_hashes": hashes,
    })
}

/// Render a stored block for the wire: the signed wrapper when authorship
/// survives, else the bare triple. Content hashes verify either way.
pub fn exchange_value(record: &StoredBlock) -> Value {
    match (&record.author_hash, &record.signature) {
        (Some(author), Some(signature)) => json!({
            "foodblock": record.block,
            "author_hash": author,
            "signature": signature,
            "protocol_version": record.protocol_version,
        }),
        _ => serde_json::to_value(&record.block).unwrap_or_default(),
    }
}

fn block_hash_of(value: &Value) -> Option<String> {
    // Wrapped submissions carry the triple under "foodblock".
    let triple = value.get("foodblock").unwrap_or(value);
    let block: fb_types::Block = serde_json::from_value(triple.clone()).ok()?;
    block.hash().ok().map(|h| h.to_string())
}

/// Receive pushed blocks through the standard pipeline.
pub async fn handle_push(
    pipeline: &InsertPipeline,
    request: PushRequest,
) -> Result<(PushResponse, BatchReport), FederationError> {
    if let (Some(signature), Some(public_key)) = (&request.signature, &request.public_key) {
        let peer_url = request.peer_url.as_deref().unwrap_or_default();
        let payload = push_payload(peer_url, &request.blocks);
        verify_value(&payload, signature, public_key).map_err(|e| {
            warn!(peer = %peer_url, "Signed push failed verification");
            e
        })?;
    }

    let report = pipeline.insert_batch(request.blocks).await;
    let response = PushResponse::from(&report);
    Ok((response, report))
}

/// `POST /.well-known/foodblock/pull` request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PullRequest {
    /// Exclusive created_at cursor, unix millis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<i64>,
    /// Alternative cursor: everything after this stored block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_hash: Option<Hash>,
    /// Exact-or-prefix type filters; empty means all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// Pull page with its continuation cursor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullResponse {
    pub blocks: Vec<StoredBlock>,
    pub count: usize,
    /// created_at of the last returned block; feed back as `since`.
    pub cursor: Option<i64>,
    pub has_more: bool,
}

/// Export blocks since a cursor.
pub fn handle_pull(
    store: &dyn BlockStore,
    request: &PullRequest,
) -> Result<PullResponse, FederationError> {
    let limit = request
        .limit
        .unwrap_or(PULL_LIMIT_DEFAULT)
        .clamp(1, PULL_LIMIT_MAX);

    let since = match (&request.after_hash, request.since) {
        (Some(after), _) => Some(
            store
                .get(after)
                .ok_or_else(|| FederationError::BadPayload(format!("unknown after_hash {after}")))?
                .created_at,
        ),
        (None, since) => since,
    };

    let type_filters = request.types.clone().unwrap_or_default();
    let type_ok = |block_type: &str| {
        type_filters.is_empty()
            || type_filters.iter().any(|f| {
                block_type == f
                    || block_type
                        .strip_prefix(f.as_str())
                        .is_some_and(|rest| rest.starts_with('.'))
            })
    };

    let mut matched = 0usize;
    let mut blocks = Vec::new();
    for hash in store.all_ordered() {
        let Some(record) = store.get(&hash) else { continue };
        if record.visibility == Visibility::Deleted {
            continue;
        }
        if let Some(since) = since {
            if record.created_at <= since {
                continue;
            }
        }
        if !type_ok(&record.block.block_type) {
            continue;
        }
        matched += 1;
        if blocks.len() < limit {
            blocks.push(record);
        }
    }

    let cursor = blocks.last().map(|b| b.created_at).or(since);
    let count = blocks.len();
    let has_more = matched > count;
    Ok(PullResponse {
        blocks,
        count,
        cursor,
        has_more,
    })
}

//! Human-interface endpoints: the NL entry and the FBN/URI projections.
//!
//! Everything here except `POST /fb` is a pure projection — no state is
//! written.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use fb_fbn::{explain, fb, format_block, from_uri, parse_fbn, to_uri};
use fb_types::Hash;
use serde::Deserialize;
use serde_json::{json, Value};

fn parse_hash(raw: &str) -> Result<Hash, ApiError> {
    Hash::new(raw).map_err(|e| ApiError::bad_request(e.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    text: String,
}

/// `POST /fb` — one sentence in, a linked batch of blocks stored.
pub async fn fb_entry(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<Value>, ApiError> {
    let request: TextBody = serde_json::from_str(&body)
        .map_err(|e| ApiError::bad_request(format!("invalid JSON: {e}")))?;

    let result = fb(&request.text)?;
    let values: Vec<Value> = result
        .blocks
        .iter()
        .map(|b| serde_json::to_value(&b.block).unwrap_or_default())
        .collect();
    let report = state.pipeline.insert_batch(values).await;

    let mut response = serde_json::to_value(&result).unwrap_or_default();
    if let Some(map) = response.as_object_mut() {
        map.insert("inserted".to_string(), json!(report.inserted));
        map.insert("skipped".to_string(), json!(report.skipped));
        map.insert("failed".to_string(), json!(report.failed));
    }
    Ok(Json(response))
}

/// `GET /explain/:hash` — one-paragraph description of a stored block.
pub async fn explain_block(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let hash = parse_hash(&hash)?;
    let record = state
        .store
        .get(&hash)
        .ok_or_else(|| ApiError::not_found(format!("block not found: {hash}")))?;
    Ok(Json(json!({
        "hash": hash,
        "explanation": explain(&record),
    })))
}

/// `POST /parse-fbn` — parse FBN text into a block without storing it.
pub async fn parse(body: String) -> Result<Json<Value>, ApiError> {
    let request: TextBody = serde_json::from_str(&body)
        .map_err(|e| ApiError::bad_request(format!("invalid JSON: {e}")))?;
    let block = parse_fbn(&request.text)?;
    let hash = block
        .hash()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    Ok(Json(json!({
        "hash": hash,
        "type": block.block_type,
        "state": block.state,
        "refs": block.refs,
    })))
}

/// `GET /format/:hash` — render a stored block as FBN text.
pub async fn format(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let hash = parse_hash(&hash)?;
    let record = state
        .store
        .get(&hash)
        .ok_or_else(|| ApiError::not_found(format!("block not found: {hash}")))?;
    Ok(Json(json!({
        "hash": hash,
        "fbn": format_block(&record.block),
    })))
}

/// `GET /uri/:hash` — the `fb://` form of a stored block.
pub async fn uri(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let hash = parse_hash(&hash)?;
    if !state.store.contains(&hash) {
        return Err(ApiError::not_found(format!("block not found: {hash}")));
    }
    Ok(Json(json!({ "hash": hash, "uri": to_uri(&hash) })))
}

#[derive(Debug, Deserialize)]
pub struct UriBody {
    uri: String,
}

/// `POST /resolve-uri` — `fb://<hash>` back to a hash, with the block when
/// stored locally.
pub async fn resolve_uri(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<Value>, ApiError> {
    let request: UriBody = serde_json::from_str(&body)
        .map_err(|e| ApiError::bad_request(format!("invalid JSON: {e}")))?;
    let hash = from_uri(&request.uri)?;
    let block = state.store.get(&hash);
    Ok(Json(json!({
        "hash": hash,
        "found": block.is_some(),
        "block": block,
    })))
}

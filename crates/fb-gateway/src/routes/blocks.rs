//! Block creation, fetch, listing, batch, and tombstoning.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use fb_store::{query_blocks, BlockSubmission, BlocksQuery};
use fb_types::{mechanism, Block, Hash};
use serde::Deserialize;
use serde_json::{json, Map, Value};

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn parse_body(body: &str) -> Result<Value, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::bad_request(format!("invalid JSON: {e}")))
}

fn parse_hash(raw: &str) -> Result<Hash, ApiError> {
    Hash::new(raw).map_err(|e| ApiError::bad_request(e.to_string()))
}

/// `GET /` — server summary and endpoint catalog.
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(fb_federation::discovery::server_summary(
        &state.identity,
        state.store.as_ref(),
    ))
}

/// `GET /health` — liveness.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "blocks": state.store.count(),
        "version": fb_types::PROTOCOL_VERSION,
    }))
}

/// `POST /blocks` — insert one block, bare or wrapped. Agent-authored
/// blocks pass the permission gate first.
pub async fn create_block(
    State(state): State<AppState>,
    body: String,
) -> Result<impl IntoResponse, ApiError> {
    let value = parse_body(&body)?;
    let submission = BlockSubmission::from_value(value)?;

    if let Some(agent_hash) = submission.block.ref_values("agent").into_iter().next() {
        state.gate.check(&submission.block, &agent_hash, now_ms())?;
    }

    let outcome = state.pipeline.insert(submission).await?;
    let status = if outcome.exists {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(json!({ "exists": outcome.exists, "block": outcome.block })),
    ))
}

/// `POST /blocks/batch` (and its `/batch` alias) — multi-pass
/// dependency-ordered insert.
pub async fn batch(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<Value>, ApiError> {
    let value = parse_body(&body)?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("blocks") {
            Some(Value::Array(items)) => items,
            _ => return Err(ApiError::bad_request("expected an array of blocks")),
        },
        _ => return Err(ApiError::bad_request("expected an array of blocks")),
    };

    for item in &items {
        if let Ok(submission) = BlockSubmission::from_value(item.clone()) {
            if let Some(agent_hash) = submission.block.ref_values("agent").into_iter().next() {
                state.gate.check(&submission.block, &agent_hash, now_ms())?;
            }
        }
    }

    let report = state.pipeline.insert_batch(items).await;
    Ok(Json(serde_json::to_value(report).unwrap_or_default()))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(rename = "type")]
    type_filter: Option<String>,
    #[serde(rename = "ref")]
    ref_role: Option<String>,
    ref_value: Option<String>,
    heads: Option<bool>,
    limit: Option<usize>,
    offset: Option<usize>,
}

/// `GET /blocks` — list by type/ref/heads with bounded pagination.
pub async fn list_blocks(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, ApiError> {
    let ref_value = params
        .ref_value
        .as_deref()
        .map(parse_hash)
        .transpose()?;

    let query = BlocksQuery {
        type_filter: params.type_filter,
        ref_role: params.ref_role,
        ref_value,
        heads_only: params.heads.unwrap_or(false),
        limit: params.limit,
        offset: params.offset.unwrap_or(0),
    };
    let blocks = query_blocks(state.store.as_ref(), &query);
    Ok(Json(json!({ "count": blocks.len(), "blocks": blocks })))
}

/// `GET /blocks/:hash`.
pub async fn get_block(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let hash = parse_hash(&hash)?;
    let record = state
        .store
        .get(&hash)
        .ok_or_else(|| ApiError::not_found(format!("block not found: {hash}")))?;
    Ok(Json(serde_json::to_value(record).unwrap_or_default()))
}

/// `DELETE /blocks/:hash` — emit a tombstone for the target.
pub async fn delete_block(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let target = parse_hash(&hash)?;
    if !state.store.contains(&target) {
        return Err(ApiError::not_found(format!("block not found: {target}")));
    }

    let mut state_fields = Map::new();
    state_fields.insert("reason".to_string(), json!("api_delete"));
    let mut refs = Map::new();
    refs.insert("target".to_string(), json!(target.as_str()));
    refs.insert("updates".to_string(), json!(target.as_str()));

    let tombstone = Block::create(mechanism::TOMBSTONE, state_fields, refs)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    let outcome = state
        .pipeline
        .insert(BlockSubmission::bare(tombstone.block))
        .await?;

    Ok(Json(json!({
        "tombstoned": target,
        "tombstone": outcome.block,
    })))
}

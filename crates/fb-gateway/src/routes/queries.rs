//! Read-side endpoints: chain, tree, forward, heads, find, verify, types.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use fb_crypto::{verify_wrapper, Ed25519PublicKey};
use fb_store::{query, FindQuery, SortOrder, FIND_STATE_WHITELIST};
use fb_types::{mechanism, Hash, SignedWrapper};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

fn parse_hash(raw: &str) -> Result<Hash, ApiError> {
    Hash::new(raw).map_err(|e| ApiError::bad_request(e.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct DepthParams {
    depth: Option<usize>,
}

/// `GET /chain/:hash` — backward walk over `refs.updates`, newest first.
pub async fn chain(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    Query(params): Query<DepthParams>,
) -> Result<Json<Value>, ApiError> {
    let start = parse_hash(&hash)?;
    if !state.store.contains(&start) {
        return Err(ApiError::not_found(format!("block not found: {start}")));
    }
    let blocks = query::chain(state.store.as_ref(), &start, params.depth);
    Ok(Json(json!({ "count": blocks.len(), "blocks": blocks })))
}

/// `GET /tree/:hash` — recursive ref expansion, cycle-safe, depth-capped.
pub async fn tree(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    Query(params): Query<DepthParams>,
) -> Result<Json<Value>, ApiError> {
    let start = parse_hash(&hash)?;
    let node = query::tree(state.store.as_ref(), &start, params.depth)
        .ok_or_else(|| ApiError::not_found(format!("block not found: {start}")))?;
    Ok(Json(serde_json::to_value(node).unwrap_or_default()))
}

#[derive(Debug, Deserialize)]
pub struct ForwardParams {
    #[serde(rename = "type")]
    type_filter: Option<String>,
    role: Option<String>,
}

/// `GET /forward/:hash` — blocks referencing a target.
pub async fn forward(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    Query(params): Query<ForwardParams>,
) -> Result<Json<Value>, ApiError> {
    let target = parse_hash(&hash)?;
    let blocks = query::forward(
        state.store.as_ref(),
        &target,
        params.type_filter.as_deref(),
        params.role.as_deref(),
    );
    Ok(Json(json!({ "count": blocks.len(), "blocks": blocks })))
}

#[derive(Debug, Deserialize)]
pub struct HeadsParams {
    #[serde(rename = "type")]
    type_filter: Option<String>,
}

/// `GET /heads` — current heads only.
pub async fn heads(
    State(state): State<AppState>,
    Query(params): Query<HeadsParams>,
) -> Result<Json<Value>, ApiError> {
    let blocks = query::heads(state.store.as_ref(), params.type_filter.as_deref());
    Ok(Json(json!({ "count": blocks.len(), "blocks": blocks })))
}

/// `GET /find` — composable search. Unknown `state.<field>` keys outside
/// the whitelist are silently ignored.
pub async fn find(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let mut query = FindQuery::default();

    if let Some(t) = params.get("type") {
        query.type_filter = Some(t.clone());
    }
    if let Some(role) = params.get("ref") {
        query.ref_role = Some(role.clone());
    }
    if let Some(value) = params.get("ref_value") {
        query.ref_value = Some(parse_hash(value)?);
    }
    if let Some(author) = params.get("author") {
        query.author = Some(parse_hash(author)?);
    }
    if let Some(after) = params.get("after") {
        query.after = Some(
            after
                .parse()
                .map_err(|_| ApiError::bad_request("after must be unix millis"))?,
        );
    }
    if let Some(before) = params.get("before") {
        query.before = Some(
            before
                .parse()
                .map_err(|_| ApiError::bad_request("before must be unix millis"))?,
        );
    }
    if let Some(heads) = params.get("heads") {
        query.heads = heads != "false";
    }
    if let Some(sort) = params.get("sort") {
        query.sort = SortOrder::parse(sort);
    }
    if let Some(limit) = params.get("limit") {
        query.limit = limit.parse().ok();
    }
    if let Some(offset) = params.get("offset") {
        query.offset = offset.parse().unwrap_or(0);
    }
    for (key, value) in &params {
        if let Some(field) = key.strip_prefix("state.") {
            if FIND_STATE_WHITELIST.contains(&field) {
                query
                    .state_filters
                    .push((field.to_string(), Value::String(value.clone())));
            }
        }
    }

    let result = query::find(state.store.as_ref(), &query);
    Ok(Json(serde_json::to_value(result).unwrap_or_default()))
}

/// `GET /verify/:hash` — re-verify a stored block's signature against its
/// author's published key.
pub async fn verify(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let hash = parse_hash(&hash)?;
    let record = state
        .store
        .get(&hash)
        .ok_or_else(|| ApiError::not_found(format!("block not found: {hash}")))?;

    let (Some(author), Some(signature)) = (&record.author_hash, &record.signature) else {
        return Ok(Json(json!({
            "hash": hash,
            "verified": false,
            "reason": "block is unsigned",
        })));
    };

    let Some(author_block) = state.store.get(author) else {
        return Ok(Json(json!({
            "hash": hash,
            "verified": false,
            "reason": "author block unknown",
        })));
    };
    let Some(key_hex) = author_block.block.state_str("public_key") else {
        return Ok(Json(json!({
            "hash": hash,
            "verified": false,
            "reason": "author has no published key",
        })));
    };
    let Ok(key) = Ed25519PublicKey::from_hex(key_hex) else {
        return Ok(Json(json!({
            "hash": hash,
            "verified": false,
            "reason": "published key is malformed",
        })));
    };

    let wrapper = SignedWrapper {
        foodblock: record.block.clone(),
        author_hash: author.clone(),
        signature: signature.clone(),
        protocol_version: record.protocol_version.clone(),
    };
    let verified = verify_wrapper(&wrapper, &key).is_ok();
    Ok(Json(json!({
        "hash": hash,
        "author_hash": author,
        "verified": verified,
    })))
}

/// `GET /types` — stored types with counts plus advisory schema blocks.
pub async fn types(State(state): State<AppState>) -> Json<Value> {
    let schemas = schema_blocks(&state, None);
    let types: Vec<Value> = state
        .store
        .type_counts()
        .into_iter()
        .map(|(block_type, count)| json!({ "type": block_type, "count": count }))
        .collect();
    Json(json!({ "types": types, "schemas": schemas }))
}

/// `GET /types/:type` — one type with its advisory schemas.
pub async fn type_detail(
    State(state): State<AppState>,
    Path(block_type): Path<String>,
) -> Json<Value> {
    let count = state.store.by_type(&block_type, true).len();
    let schemas = schema_blocks(&state, Some(&block_type));
    Json(json!({
        "type": block_type,
        "count": count,
        "schemas": schemas,
    }))
}

fn schema_blocks(state: &AppState, target_type: Option<&str>) -> Vec<Value> {
    state
        .store
        .by_type(mechanism::SCHEMA, true)
        .into_iter()
        .filter_map(|h| state.store.get(&h))
        .filter(|b| b.is_head)
        .filter(|b| {
            target_type
                .map(|t| b.block.state_str("target_type") == Some(t))
                .unwrap_or(true)
        })
        .map(|b| serde_json::to_value(b).unwrap_or_default())
        .collect()
}

//! The `/.well-known/foodblock` endpoints.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use fb_federation::{
    build_discovery, handle_handshake, handle_pull, handle_push, HandshakeRequest, PullRequest,
    PushRequest,
};
use serde_json::{json, Value};

fn parse_body<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::bad_request(format!("invalid JSON: {e}")))
}

/// `GET /.well-known/foodblock` — signed discovery document.
pub async fn discovery(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let document = build_discovery(&state.identity, state.store.as_ref(), state.peers.urls())?;
    Ok(Json(serde_json::to_value(document).unwrap_or_default()))
}

/// `POST /.well-known/foodblock/handshake` — verify and register a peer.
pub async fn handshake(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<Value>, ApiError> {
    let request: HandshakeRequest = parse_body(&body)?;
    let ack = handle_handshake(&state.identity, &state.peers, &request)?;
    Ok(Json(serde_json::to_value(ack).unwrap_or_default()))
}

/// `POST /.well-known/foodblock/push` — receive blocks through the standard
/// pipeline.
pub async fn push(State(state): State<AppState>, body: String) -> Result<Json<Value>, ApiError> {
    let request: PushRequest = parse_body(&body)?;
    let (response, report) = handle_push(&state.pipeline, request).await?;
    Ok(Json(json!({
        "inserted": response.inserted,
        "skipped": response.skipped,
        "failed": response.failed,
        "results": report.results,
    })))
}

/// `POST /.well-known/foodblock/pull` — export blocks since a cursor.
pub async fn pull(State(state): State<AppState>, body: String) -> Result<Json<Value>, ApiError> {
    let request: PullRequest = if body.trim().is_empty() {
        PullRequest::default()
    } else {
        parse_body(&body)?
    };
    let response = handle_pull(state.store.as_ref(), &request)?;
    Ok(Json(serde_json::to_value(response).unwrap_or_default()))
}

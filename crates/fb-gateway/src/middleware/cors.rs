//! CORS layer.
//!
//! The protocol surface is deliberately permissive: any origin may read and
//! submit blocks; authenticity comes from content hashes and signatures,
//! not from the browser origin.

use axum::http::Method;
use tower_http::cors::{Any, CorsLayer};

/// Permissive allow-origin with an explicit method allowlist.
pub fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}

//! Route handlers and router assembly.

pub mod blocks;
pub mod federation;
pub mod human;
pub mod queries;
pub mod stream;

use crate::middleware::{create_cors_layer, RateLimitLayer};
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Assemble the full router with the middleware stack, nested under the
/// configured base path when one is set.
pub fn build_router(state: AppState) -> Router {
    let rate_limit = RateLimitLayer::new(
        state.config.rate_limit_per_minute,
        state.config.rate_limit_disabled,
    );

    // Stale-bucket cleanup rides alongside the router.
    tokio::spawn(crate::middleware::rate_limit::cleanup_task(
        rate_limit.state(),
        Duration::from_secs(60),
        Duration::from_secs(600),
    ));

    let api = Router::new()
        .route("/", get(blocks::root))
        .route("/health", get(blocks::health))
        .route("/blocks", post(blocks::create_block).get(blocks::list_blocks))
        .route("/blocks/batch", post(blocks::batch))
        .route("/batch", post(blocks::batch))
        .route(
            "/blocks/:hash",
            get(blocks::get_block).delete(blocks::delete_block),
        )
        .route("/fb", post(human::fb_entry))
        .route("/chain/:hash", get(queries::chain))
        .route("/tree/:hash", get(queries::tree))
        .route("/forward/:hash", get(queries::forward))
        .route("/heads", get(queries::heads))
        .route("/find", get(queries::find))
        .route("/verify/:hash", get(queries::verify))
        .route("/types", get(queries::types))
        .route("/types/:block_type", get(queries::type_detail))
        .route("/stream", get(stream::stream))
        .route("/explain/:hash", get(human::explain_block))
        .route("/parse-fbn", post(human::parse))
        .route("/format/:hash", get(human::format))
        .route("/uri/:hash", get(human::uri))
        .route("/resolve-uri", post(human::resolve_uri))
        .route("/.well-known/foodblock", get(federation::discovery))
        .route(
            "/.well-known/foodblock/handshake",
            post(federation::handshake),
        )
        .route("/.well-known/foodblock/push", post(federation::push))
        .route("/.well-known/foodblock/pull", post(federation::pull))
        .with_state(state.clone());

    // The rate limiter sits outside the body limiter: cheap rejection
    // first, and it only understands unlimited request bodies.
    let app = api.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(create_cors_layer())
            .layer(rate_limit)
            .layer(RequestBodyLimitLayer::new(state.config.body_limit))
            .layer(TimeoutLayer::new(Duration::from_secs(
                state.config.timeout_secs,
            ))),
    );

    match &state.config.base_path {
        Some(base) => Router::new().nest(base, app),
        None => app,
    }
}

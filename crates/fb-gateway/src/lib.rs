//! # FoodBlock Gateway
//!
//! The HTTP surface of the reference server: routing for every protocol
//! endpoint, the tower middleware stack (CORS, body limit, timeout, per-IP
//! rate limit), the JSON error envelope, and SSE streaming off the event
//! bus.
//!
//! The gateway holds no state of its own — every handler is a thin
//! translation between the wire and the store, pipeline, agent gate, and
//! federation layers.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod service;
pub mod state;

pub use config::GatewayConfig;
pub use error::ApiError;
pub use service::GatewayService;
pub use state::AppState;

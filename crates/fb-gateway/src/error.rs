//! The JSON error envelope.
//!
//! Every failure leaves the gateway as `{"error": "<human message>"}` with
//! the HTTP status carrying the kind. Rate-limit responses add Retry-After.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fb_agent::AgentError;
use fb_federation::FederationError;
use fb_fbn::FbnError;
use fb_store::StoreError;
use serde_json::json;

/// A wire-level error: status plus human message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    /// Seconds for the Retry-After header on 429s.
    pub retry_after: Option<u64>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn rate_limited(message: impl Into<String>, retry_after: u64) -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            message: message.into(),
            retry_after: Some(retry_after),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response =
            (self.status, Json(json!({ "error": self.message }))).into_response();
        if let Some(retry_after) = self.retry_after {
            if let Ok(value) = retry_after.to_string().parse() {
                response.headers_mut().insert("Retry-After", value);
            }
        }
        response
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        let status = match &e {
            StoreError::BadRequest(_) | StoreError::Block(_) | StoreError::HashMismatch { .. } => {
                StatusCode::BAD_REQUEST
            }
            StoreError::InvalidSignature(_) => StatusCode::FORBIDDEN,
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl From<AgentError> for ApiError {
    fn from(e: AgentError) -> Self {
        let message = format!("{} ({})", e, e.kind());
        match e {
            AgentError::RateLimited { .. } => Self::rate_limited(message, 3600),
            AgentError::Store(inner) => inner.into(),
            AgentError::Block(_) | AgentError::NotADraft(_) => Self::bad_request(message),
            AgentError::UnknownAgent(_)
            | AgentError::NotAnAgent(_)
            | AgentError::CapabilityDenied { .. }
            | AgentError::AmountExceeded { .. } => Self::forbidden(message),
        }
    }
}

impl From<FederationError> for ApiError {
    fn from(e: FederationError) -> Self {
        match e {
            FederationError::InvalidSignature => Self::forbidden(e.to_string()),
            FederationError::BadPayload(_) | FederationError::Canonical(_) => {
                Self::bad_request(e.to_string())
            }
            FederationError::Crypto(_) => Self::bad_request(e.to_string()),
            FederationError::Store(inner) => inner.into(),
            FederationError::PeerUnreachable(_) | FederationError::PeerRejected { .. } => {
                Self::new(StatusCode::BAD_GATEWAY, e.to_string())
            }
        }
    }
}

impl From<FbnError> for ApiError {
    fn from(e: FbnError) -> Self {
        Self::bad_request(e.to_string())
    }
}

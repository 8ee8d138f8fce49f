//! The outbound HTTP client for peer exchange.

use crate::discovery::DiscoveryDocument;
use crate::errors::FederationError;
use crate::exchange::{HandshakeAck, HandshakeRequest, PullRequest, PullResponse, PushRequest, PushResponse};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-round-trip timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Retries after the first attempt, with exponential backoff.
const RETRIES: u32 = 2;
const BACKOFF_BASE: Duration = Duration::from_secs(1);

/// HTTP client for the well-known federation endpoints.
pub struct FederationClient {
    http: reqwest::Client,
}

impl FederationClient {
    pub fn new() -> Result<Self, FederationError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http })
    }

    /// `GET {base}/.well-known/foodblock`.
    pub async fn discover(&self, base_url: &str) -> Result<DiscoveryDocument, FederationError> {
        let url = format!("{}/.well-known/foodblock", base_url.trim_end_matches('/'));
        self.get_json(&url).await
    }

    /// `POST {base}/.well-known/foodblock/handshake`.
    pub async fn handshake(
        &self,
        base_url: &str,
        request: &HandshakeRequest,
    ) -> Result<HandshakeAck, FederationError> {
        let url = format!(
            "{}/.well-known/foodblock/handshake",
            base_url.trim_end_matches('/')
        );
        self.post_json(&url, request).await
    }

    /// `POST {base}/.well-known/foodblock/push`, with retry.
    pub async fn push(
        &self,
        base_url: &str,
        request: &PushRequest,
    ) -> Result<PushResponse, FederationError> {
        let url = format!(
            "{}/.well-known/foodblock/push",
            base_url.trim_end_matches('/')
        );
        self.post_json_with_retry(&url, request).await
    }

    /// `POST {base}/.well-known/foodblock/pull`, with retry.
    pub async fn pull(
        &self,
        base_url: &str,
        request: &PullRequest,
    ) -> Result<PullResponse, FederationError> {
        let url = format!(
            "{}/.well-known/foodblock/pull",
            base_url.trim_end_matches('/')
        );
        self.post_json_with_retry(&url, request).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FederationError> {
        let response = self.http.get(url).send().await?;
        Self::decode(response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, FederationError> {
        let response = self.http.post(url).json(body).send().await?;
        Self::decode(response).await
    }

    async fn post_json_with_retry<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, FederationError> {
        let mut attempt = 0;
        loop {
            match self.post_json(url, body).await {
                Ok(value) => return Ok(value),
                // 4xx means the peer understood and said no; retrying
                // cannot change that.
                Err(FederationError::PeerRejected { status, body })
                    if (400..500).contains(&status) =>
                {
                    return Err(FederationError::PeerRejected { status, body });
                }
                Err(e) if attempt < RETRIES => {
                    let delay = BACKOFF_BASE * 2u32.pow(attempt);
                    attempt += 1;
                    warn!(url, attempt, error = %e, "Federation call failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, FederationError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FederationError::PeerRejected {
                status: status.as_u16(),
                body,
            });
        }
        debug!(status = status.as_u16(), "Federation response");
        response
            .json::<T>()
            .await
            .map_err(|e| FederationError::BadPayload(e.to_string()))
    }
}

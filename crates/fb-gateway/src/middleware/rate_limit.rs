//! Per-IP rate limiting.
//!
//! Token buckets from `governor`, one per client IP in a concurrent map,
//! with periodic cleanup of stale entries. The limiter is per-process and
//! soft; production deployments MAY substitute a distributed limiter behind
//! the same layer.

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use dashmap::DashMap;
use governor::clock::{Clock, DefaultClock};
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::{Layer, Service};
use tracing::{debug, warn};

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

struct Bucket {
    limiter: DirectLimiter,
    last_access: Instant,
}

impl Bucket {
    fn new(per_minute: u32) -> Self {
        let quota = Quota::per_minute(
            NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::new(100).expect("nonzero")),
        );
        Self {
            limiter: RateLimiter::direct(quota),
            last_access: Instant::now(),
        }
    }

    fn check(&mut self) -> Result<(), Duration> {
        self.last_access = Instant::now();
        match self.limiter.check() {
            Ok(()) => Ok(()),
            Err(not_until) => Err(not_until.wait_time_from(DefaultClock::default().now())),
        }
    }
}

/// Shared limiter state.
pub struct RateLimitState {
    buckets: DashMap<IpAddr, Bucket>,
    per_minute: u32,
    disabled: bool,
}

impl RateLimitState {
    pub fn new(per_minute: u32, disabled: bool) -> Self {
        Self {
            buckets: DashMap::new(),
            per_minute,
            disabled,
        }
    }

    /// Whether a request from this IP is allowed, or how long to wait.
    pub fn check(&self, ip: IpAddr) -> Result<(), Duration> {
        if self.disabled {
            return Ok(());
        }
        let mut bucket = self.buckets.entry(ip).or_insert_with(|| {
            debug!(ip = %ip, "New rate limit bucket");
            Bucket::new(self.per_minute)
        });
        bucket.check()
    }

    /// Drop buckets idle longer than `max_age`.
    pub fn cleanup(&self, max_age: Duration) {
        let now = Instant::now();
        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.last_access) <= max_age);
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

/// The tower layer.
#[derive(Clone)]
pub struct RateLimitLayer {
    state: Arc<RateLimitState>,
}

impl RateLimitLayer {
    pub fn new(per_minute: u32, disabled: bool) -> Self {
        Self {
            state: Arc::new(RateLimitState::new(per_minute, disabled)),
        }
    }

    pub fn state(&self) -> Arc<RateLimitState> {
        Arc::clone(&self.state)
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            state: Arc::clone(&self.state),
        }
    }
}

/// The tower service.
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    state: Arc<RateLimitState>,
}

impl<S, ResBody> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ResBody: axum::body::HttpBody<Data = axum::body::Bytes> + Send + 'static,
    ResBody::Error: Into<axum::BoxError>,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let state = Arc::clone(&self.state);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let ip = extract_client_ip(&req);
            match state.check(ip) {
                Ok(()) => inner.call(req).await.map(|resp| resp.map(Body::new)),
                Err(wait) => {
                    let retry_secs = wait.as_secs().max(1);
                    warn!(ip = %ip, retry_after_secs = retry_secs, "Rate limit exceeded");
                    Ok(rate_limit_response(retry_secs))
                }
            }
        })
    }
}

/// Client IP: forwarded headers first, connection info second.
fn extract_client_ip<B>(req: &Request<B>) -> IpAddr {
    if let Some(forwarded) = req.headers().get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(first) = forwarded_str.split(',').next() {
                if let Ok(ip) = first.trim().parse::<IpAddr>() {
                    return ip;
                }
            }
        }
    }
    if let Some(real_ip) = req.headers().get("x-real-ip") {
        if let Ok(ip) = real_ip.to_str().unwrap_or_default().parse::<IpAddr>() {
            return ip;
        }
    }
    if let Some(connect_info) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return connect_info.0.ip();
    }
    IpAddr::from([127, 0, 0, 1])
}

fn rate_limit_response(retry_secs: u64) -> Response {
    let body = serde_json::json!({ "error": "rate limit exceeded" });
    let mut response = Response::new(Body::from(
        serde_json::to_vec(&body).unwrap_or_default(),
    ));
    *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
    response
        .headers_mut()
        .insert("Content-Type", "application/json".parse().expect("static"));
    if let Ok(value) = retry_secs.to_string().parse() {
        response.headers_mut().insert("Retry-After", value);
    }
    response
}

/// Background cleanup of stale buckets.
pub async fn cleanup_task(state: Arc<RateLimitState>, interval: Duration, max_age: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        state.cleanup(max_age);
    }
}

//! The SSE stream: `GET /stream?type=&author=&ref=`.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use fb_bus::{EventFilter, TypePattern};
use fb_types::Hash;
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const KEEP_ALIVE: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
pub struct StreamParams {
    /// Exact type or trailing-`*` prefix.
    #[serde(rename = "type")]
    type_filter: Option<String>,
    /// Match on author_hash.
    author: Option<String>,
    /// Match any ref role pointing at this hash.
    #[serde(rename = "ref")]
    ref_value: Option<String>,
}

/// Decrements the connection counter when the stream is dropped.
struct ConnectionGuard(Arc<AtomicUsize>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
        debug!("SSE client disconnected");
    }
}

/// Open an SSE stream with a per-connection filter. Delivery preserves
/// insertion order; a slow client lags behind the bounded bus buffer and
/// silently loses the oldest events.
pub async fn stream(
    State(state): State<AppState>,
    Query(params): Query<StreamParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let cap = state.config.max_sse_connections;
    let live = state.sse_connections.fetch_add(1, Ordering::SeqCst);
    if live >= cap {
        state.sse_connections.fetch_sub(1, Ordering::SeqCst);
        return Err(ApiError::unavailable(format!(
            "SSE connection cap reached ({cap})"
        )));
    }
    let guard = ConnectionGuard(Arc::clone(&state.sse_connections));

    let mut filter = EventFilter::all();
    if let Some(type_filter) = &params.type_filter {
        filter.types.push(TypePattern::new(type_filter.as_str()));
    }
    if let Some(author) = &params.author {
        filter.author =
            Some(Hash::new(author.as_str()).map_err(|e| ApiError::bad_request(e.to_string()))?);
    }
    if let Some(target) = &params.ref_value {
        filter.ref_value =
            Some(Hash::new(target.as_str()).map_err(|e| ApiError::bad_request(e.to_string()))?);
    }

    let subscription = state.bus.subscribe(filter);
    debug!("SSE client connected");

    let events = futures::stream::unfold(
        (subscription, guard),
        |(mut subscription, guard)| async move {
            let event = subscription.recv().await?;
            let data = serde_json::to_string(&*event.block).unwrap_or_default();
            let sse_event = Event::default().event("new_block").data(data);
            Some((Ok::<_, Infallible>(sse_event), (subscription, guard)))
        },
    );

    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(KEEP_ALIVE).text("keep-alive")))
}

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::State;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures::stream::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use arena_core::standings::StandingsUpdate;

use crate::error::AppError;
use crate::state::{AppState, ConnectionGuard};

/// GET /api/v1/standings/stream: one `standings` event per successful recompute.
pub async fn standings_stream(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, AppError> {
    let max_sse = state.config.limits.max_sse_subscribers;
    let current = state.sse_subscriber_count.load(Ordering::Relaxed);
    if current >= max_sse {
        tracing::warn!(current, max = max_sse, "SSE subscriber limit reached");
        return Err(AppError::Unavailable("too many stream subscribers".to_string()));
    }

    let guard = ConnectionGuard::new(Arc::clone(&state.sse_subscriber_count));
    let rx = state.tournament.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(move |result: Result<StandingsUpdate, _>| {
        let _guard = &guard;
        match result {
            Ok(update) => {
                let json = serde_json::to_string(&update).unwrap_or_default();
                Some(Ok(SseEvent::default().event("standings").data(json)))
            },
            Err(e) => {
                tracing::warn!("standings stream receive error: {e}");
                None
            },
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

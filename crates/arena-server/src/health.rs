use std::sync::atomic::Ordering;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use arena_core::RangeStore;

use crate::state::AppState;

/// Structured health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub backend: &'static str,
    pub sse: usize,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        backend: state.tournament.store().name(),
        sse: state.sse_subscriber_count.load(Ordering::Relaxed),
    })
}

/// Ready once a store is configured and answers a tab listing.
pub async fn readiness_check(State(state): State<AppState>) -> &'static str {
    let store = state.tournament.store();
    if !store.is_configured() {
        return "not ready: store is not configured";
    }
    match store.list_sheets().await {
        Ok(_) => "ready",
        Err(e) => {
            tracing::warn!(error = %e, "readiness probe failed");
            "not ready: store is unreachable"
        },
    }
}

pub mod api;
pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod health;
pub mod rate_limit;
pub mod sse;
pub mod state;

use std::time::Duration;

use axum::http::{HeaderValue, header};
use axum::routing::{get, post};
use axum::{Router, middleware};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;

use config::ServerConfig;
use state::AppState;

/// Build the Axum router and application state from a config.
pub fn build_app(config: ServerConfig) -> (Router<()>, AppState) {
    let state = AppState::new(config);
    (build_app_with_state(state.clone()), state)
}

/// Build the router around existing state.
pub fn build_app_with_state(state: AppState) -> Router<()> {
    let web_root = state.config.web_root.clone();
    let timeout = Duration::from_secs(state.config.limits.request_timeout_secs);

    let admin_routes = Router::new()
        .route("/results/elimination", post(api::submit_elimination))
        .route("/results/elimination/batch", post(api::submit_batch))
        .route("/results/elimination/upload", post(api::upload_batch))
        .route("/results/head-to-head", post(api::submit_head_to_head))
        .route("/standings/recompute", post(api::recompute))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    let login_routes = Router::new()
        .route("/admin/login", post(api::login))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::limit_logins,
        ))
        .route("/admin/logout", post(api::logout));

    let api_routes = Router::new()
        .route("/teams", get(api::list_teams).post(api::register_team))
        .route("/teams/names", get(api::team_names))
        .route("/leaderboard", get(api::leaderboard))
        .route("/stats", get(api::stats))
        .route("/winners", get(api::winners))
        .route("/standings/stream", get(sse::standings_stream))
        .merge(admin_routes)
        .merge(login_routes)
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .nest("/api/v1", api_routes)
        .fallback_service(ServeDir::new(&web_root))
        .layer(TimeoutLayer::new(timeout))
        .with_state(state)
}

/// Periodically drop idle login rate-limit buckets.
pub fn spawn_limiter_cleanup(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            state.login_limiter.cleanup(Duration::from_secs(600)).await;
        }
    });
}

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use arena_server::config::{LogFormat, ServerConfig};
use arena_server::{build_app, spawn_limiter_cleanup};

#[tokio::main]
async fn main() {
    let subscriber = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env());
    match LogFormat::from_lookup(|key| std::env::var(key).ok()) {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.init(),
    }

    let config = ServerConfig::load();
    config.validate();
    let listen_addr = config.listen_addr.clone();

    let (app, state) = build_app(config);
    spawn_limiter_cleanup(state.clone());

    let listener = match tokio::net::TcpListener::bind(&listen_addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(addr = %listen_addr, "Failed to bind: {e}");
            std::process::exit(1);
        },
    };
    tracing::info!(
        addr = %listen_addr,
        backend = state.tournament.store().name(),
        "Campus Arena server listening"
    );

    let serve = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal());
    if let Err(e) = serve.await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
    tracing::info!("Server stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

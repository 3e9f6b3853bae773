use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use arena_core::Tournament;

use crate::auth::AuthConfig;
use crate::backend::Backend;
use crate::config::ServerConfig;
use crate::rate_limit::IpRateLimiter;

pub type SharedTournament = Arc<Tournament<Backend>>;

#[derive(Clone)]
pub struct AppState {
    pub tournament: SharedTournament,
    pub auth: AuthConfig,
    pub config: Arc<ServerConfig>,
    pub login_limiter: Arc<IpRateLimiter>,
    pub sse_subscriber_count: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let backend = Backend::from_config(&config.store);
        Self::with_backend(config, backend)
    }

    /// Build state around an already constructed store.
    pub fn with_backend(config: ServerConfig, backend: Backend) -> Self {
        let tournament = Tournament::new(backend, config.store.layout.clone())
            .with_batch_limit(config.limits.batch_limit);
        let login_limiter = IpRateLimiter::new(
            config.limits.login_rate_limit_burst as f64,
            config.limits.login_rate_limit_per_sec,
        );
        Self {
            tournament: Arc::new(tournament),
            auth: AuthConfig::from(&config.auth),
            config: Arc::new(config),
            login_limiter: Arc::new(login_limiter),
            sse_subscriber_count: Arc::new(AtomicUsize::new(0)),
        }
    }
}

/// Counts one live stream subscriber; decrements on drop.
pub struct ConnectionGuard {
    counter: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    pub fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self { counter }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendKind;

    #[test]
    fn guard_tracks_count() {
        let counter = Arc::new(AtomicUsize::new(0));
        let a = ConnectionGuard::new(Arc::clone(&counter));
        let b = ConnectionGuard::new(Arc::clone(&counter));
        assert_eq!(counter.load(Ordering::Relaxed), 2);
        drop(a);
        assert_eq!(counter.load(Ordering::Relaxed), 1);
        drop(b);
        assert_eq!(counter.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn state_uses_configured_batch_limit() {
        let mut config = ServerConfig::default();
        config.store.backend = BackendKind::Memory;
        config.limits.batch_limit = 7;
        let state = AppState::new(config);
        assert_eq!(state.tournament.batch_limit(), 7);
        assert_eq!(state.tournament.store().name(), "memory");
    }
}

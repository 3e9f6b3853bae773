use std::net::SocketAddr;
use std::time::Duration;

use serde_json::{Value, json};

use arena_server::build_app;
use arena_server::config::{AuthFileConfig, BackendKind, ServerConfig};

pub const ADMIN_TOKEN: &str = "test-admin-token";

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Memory-backed server with no admin token.
    pub async fn new() -> Self {
        Self::from_config(memory_config()).await
    }

    /// Memory-backed server whose admin token is [`ADMIN_TOKEN`].
    pub async fn with_admin() -> Self {
        let config = ServerConfig {
            auth: AuthFileConfig {
                admin_token: Some(ADMIN_TOKEN.to_string()),
                secure_cookie: false,
                ..AuthFileConfig::default()
            },
            ..memory_config()
        };
        Self::from_config(config).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, _state) = build_app(config);

        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url())
    }

    /// Register a team and return its id.
    pub async fn register(&self, name: &str, game: &str) -> String {
        let resp = reqwest::Client::new()
            .post(self.url("/api/v1/teams"))
            .json(&registration(name, game))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201, "registration of {name} failed");
        let body: Value = resp.json().await.unwrap();
        body["id"].as_str().unwrap().to_string()
    }
}

pub fn memory_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.store.backend = BackendKind::Memory;
    config
}

/// A sign-up body that passes validation for any game.
pub fn registration(name: &str, game: &str) -> Value {
    json!({
        "team_name": name,
        "college": "Test College",
        "game": game,
        "captain_name": "Captain",
        "captain_email": "captain@example.com",
        "captain_phone": "9000000000",
        "player2": "Player Two",
        "player3": "Player Three",
        "player4": "Player Four",
    })
}

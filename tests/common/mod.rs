//! Common test utilities for E2E tests

#![allow(dead_code)]

use axum::{
    Form, Json, Router,
    http::{HeaderMap, StatusCode, header},
    routing::post,
};
use makin_music_backend::{AppState, api, config};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const CLIENT_ID: &str = "test-client-id";
pub const CLIENT_SECRET: &str = "test-client-secret";
pub const ALLOWED_ORIGIN: &str = "https://makin-music.vercel.app";

static METRICS: Once = Once::new();

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub static_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Server with the registered route modules and the real token URL
    pub async fn new() -> Self {
        Self::with_token_url("https://accounts.spotify.com/api/token").await
    }

    /// Server whose token exchange goes to `token_url`
    pub async fn with_token_url(token_url: &str) -> Self {
        let routes = api::RouteTable::build(api::routes::modules()).unwrap();
        Self::start(token_url, routes).await
    }

    /// Server with a custom route table
    pub async fn start(token_url: &str, routes: api::RouteTable) -> Self {
        METRICS.call_once(makin_music_backend::metrics::init_metrics);

        let static_dir = TempDir::new().unwrap();
        let config = test_config(static_dir.path(), token_url);

        // Initialize app state
        let state = AppState::new(config).unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = makin_music_backend::build_router(state.clone(), &routes);

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            static_dir,
            client,
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }
}

/// Configuration pointing at unreachable MySQL and the given token URL
pub fn test_config(static_dir: &Path, token_url: &str) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            static_dir: static_dir.to_path_buf(),
            body_limit_bytes: 100 * 1024,
        },
        cors: config::CorsConfig {
            allowed_origins: vec![
                ALLOWED_ORIGIN.to_string(),
                "https://accounts.spotify.com".to_string(),
            ],
        },
        spotify: config::SpotifyConfig {
            client_id: CLIENT_ID.to_string(),
            client_secret: CLIENT_SECRET.to_string(),
            authorize_url: "https://accounts.spotify.com/authorize".to_string(),
            token_url: token_url.to_string(),
            redirect_uri: "https://makin-music-backend.vercel.app/callback".to_string(),
            frontend_callback_url: "https://makin-music.vercel.app/auth/callback".to_string(),
            scope: config::SPOTIFY_SCOPE.to_string(),
            token_timeout_seconds: 1,
        },
        session: config::SessionConfig {
            secret: "test-session-secret-32-bytes-long!!".to_string(),
            cookie_name: "SESSION_ID".to_string(),
            max_age_seconds: 30 * 86_400,
            check_period_seconds: 86_400,
            secure: true,
        },
        database: config::DatabaseConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            username: "makin".to_string(),
            password: None,
            name: "makin_music_test".to_string(),
            max_connections: 5,
            acquire_timeout_seconds: 1,
        },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

pub fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(10))
        .build()
        .expect("failed to build no-redirect client")
}

/// Request seen by the stub token endpoint
#[derive(Debug, Clone)]
pub struct TokenRequest {
    pub content_type: Option<String>,
    pub form: HashMap<String, String>,
}

/// Stand-in for the Spotify token endpoint
pub struct TokenEndpoint {
    pub url: String,
    requests: Arc<Mutex<Vec<TokenRequest>>>,
}

impl TokenEndpoint {
    /// Answer every exchange with `status` and `body`, after `delay`
    pub async fn spawn(status: StatusCode, body: serde_json::Value, delay: Duration) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        let app = Router::new().route(
            "/api/token",
            post(move |headers: HeaderMap, Form(form): Form<HashMap<String, String>>| {
                let recorded = Arc::clone(&recorded);
                let body = body.clone();
                async move {
                    recorded.lock().unwrap().push(TokenRequest {
                        content_type: headers
                            .get(header::CONTENT_TYPE)
                            .and_then(|v| v.to_str().ok())
                            .map(ToString::to_string),
                        form,
                    });
                    tokio::time::sleep(delay).await;
                    (status, Json(body))
                }
            }),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}/api/token", addr),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<TokenRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// `name=value` pair of the first Set-Cookie header for `name`
pub fn cookie_pair(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|raw| raw.starts_with(&format!("{name}=")))
        .and_then(|raw| raw.split(';').next())
        .map(ToString::to_string)
}

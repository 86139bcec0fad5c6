//! makin-music-backend - Spotify OAuth bridge and API route host
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Middleware (tower / tower-http)             │
//! │  trace → CORS → panic capture → body limit → session        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Routes (Axum)                          │
//! │  - /login, /callback   Spotify OAuth bridge                 │
//! │  - /api/<slug>         registered route modules             │
//! │  - /metrics            Prometheus                           │
//! │  - fallback            static files, then JSON 404          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Shared resources                        │
//! │  - MySQL pool (sqlx)                                        │
//! │  - Session store (in-memory)                                │
//! │  - HTTP client for the token exchange                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: route registry and route modules
//! - `auth`: Spotify OAuth flow
//! - `session`: server-side sessions
//! - `data`: database pool
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod session;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Cloned for each request; every field is a shared handle.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Session store
    pub sessions: Arc<dyn session::SessionStore>,

    /// HTTP client for the token exchange
    pub http_client: Arc<reqwest::Client>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Configure the database pool (no connection is opened)
    /// 2. Create the in-memory session store
    /// 3. Build the HTTP client
    ///
    /// Must run inside a Tokio runtime; the pool spawns its maintenance task.
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let db = data::Database::connect_lazy(&config.database)?;

        let sessions = session::MemoryStore::new(config.session.max_age());
        tracing::info!(
            max_age_seconds = config.session.max_age_seconds,
            "Session store initialized"
        );

        let http_client = reqwest::Client::builder()
            .user_agent(concat!("makin-music-backend/", env!("CARGO_PKG_VERSION")))
            .timeout(config.spotify.token_timeout())
            .build()
            .map_err(|e| error::AppError::Internal(e.into()))?;

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db: Arc::new(db),
            sessions: Arc::new(sessions),
            http_client: Arc::new(http_client),
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState, routes: &api::RouteTable) -> axum::Router {
    use axum::{Router, extract::DefaultBodyLimit, handler::HandlerWithoutStateExt, middleware};
    use tower::ServiceBuilder;
    use tower_http::{catch_panic::CatchPanicLayer, services::ServeDir, trace::TraceLayer};

    let static_files = ServeDir::new(&state.config.server.static_dir)
        .call_fallback_on_method_not_allowed(true)
        .fallback(not_found.into_service());

    let router = Router::new()
        .merge(auth::auth_router())
        .merge(api::metrics_router());

    // Panics are caught inside CORS so the 500 still carries its headers
    routes
        .mount(router)
        .method_not_allowed_fallback(method_not_allowed)
        .fallback_service(static_files)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::session_layer,
        ))
        .layer(DefaultBodyLimit::max(state.config.server.body_limit_bytes))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer(&state.config.cors)),
        )
        .with_state(state)
}

fn build_cors_layer(cors: &config::CorsConfig) -> tower_http::cors::CorsLayer {
    use axum::http::{HeaderName, HeaderValue, Method, header};
    use tower_http::cors::CorsLayer;

    let origins: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::error!(%error, %origin, "Skipping invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_credentials(true)
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
        .expose_headers([header::SET_COOKIE])
}

/// Catch-all for requests no route or static file matched
async fn not_found() -> error::AppError {
    error::AppError::NotFound
}

async fn method_not_allowed() -> error::AppError {
    error::AppError::MethodNotAllowed
}

fn handle_panic(panic: Box<dyn std::any::Any + Send + 'static>) -> axum::response::Response {
    use axum::response::IntoResponse;

    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");

    error::AppError::Internal(anyhow::anyhow!("handler panicked: {detail}")).into_response()
}

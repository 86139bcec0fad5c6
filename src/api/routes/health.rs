//! Health check

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use std::time::Duration;

use crate::AppState;

const PING_TIMEOUT: Duration = Duration::from_secs(3);

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health))
}

/// GET /api/health
///
/// Reports whether the database pool can reach MySQL.
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let database_up = match tokio::time::timeout(PING_TIMEOUT, state.db.ping()).await {
        Ok(Ok(())) => true,
        Ok(Err(error)) => {
            tracing::warn!(%error, "Database ping failed");
            false
        }
        Err(_) => {
            tracing::warn!("Database ping timed out");
            false
        }
    };

    if database_up {
        (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "ok", "database": "up" })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "status": "degraded", "database": "down" })),
        )
    }
}

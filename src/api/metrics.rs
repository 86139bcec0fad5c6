//! Prometheus metrics endpoint

use axum::{
    Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus::{Encoder, TextEncoder};

use crate::AppState;
use crate::metrics::{DB_CONNECTIONS, REGISTRY, SESSIONS_ACTIVE};

/// Metrics endpoint handler
///
/// Refreshes the pool and session gauges, then returns all
/// metrics in Prometheus text format.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    let (size, idle) = state.db.connections();
    DB_CONNECTIONS
        .with_label_values(&["idle"])
        .set(i64::from(idle));
    DB_CONNECTIONS
        .with_label_values(&["in_use"])
        .set(i64::from(size.saturating_sub(idle)));
    SESSIONS_ACTIVE.set(state.sessions.len() as i64);

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    match encoder.encode_to_string(&metric_families) {
        Ok(metrics_text) => (
            axum::http::StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, encoder.format_type())],
            metrics_text,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to encode metrics",
            )
                .into_response()
        }
    }
}

/// Create metrics router
///
/// Exposes the `/metrics` endpoint.
pub fn metrics_router() -> Router<AppState> {
    Router::new().route("/metrics", get(metrics_handler))
}

//! Session inspection
//!
//! - GET /api/session - Current session data
//! - PUT /api/session - Merge a JSON object into the session
//! - DELETE /api/session - Destroy the session

use axum::{
    Router,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::Json,
    routing::get,
};

use crate::AppState;
use crate::error::AppError;
use crate::session::Session;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/",
        get(show_session).put(update_session).delete(destroy_session),
    )
}

type SessionData = serde_json::Map<String, serde_json::Value>;

async fn show_session(session: Session) -> Json<SessionData> {
    Json(session.entries())
}

async fn update_session(
    session: Session,
    payload: Result<Json<SessionData>, JsonRejection>,
) -> Result<Json<SessionData>, AppError> {
    let Json(values) = payload?;

    for (key, value) in values {
        if value.is_null() {
            session.remove(&key);
        } else {
            session.insert(&key, value)?;
        }
    }

    Ok(Json(session.entries()))
}

async fn destroy_session(session: Session) -> StatusCode {
    session.destroy();
    StatusCode::NO_CONTENT
}

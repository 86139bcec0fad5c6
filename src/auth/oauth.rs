//! Spotify OAuth flow
//!
//! Implements the OAuth 2.0 authorization code flow without keeping
//! tokens on the server: they are handed to the front-end in the
//! redirect fragment.

use axum::{
    Router,
    extract::{Query, State, rejection::QueryRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use super::spotify;
use crate::AppState;
use crate::error::AppError;
use crate::metrics::{OAUTH_LOGINS_TOTAL, OAUTH_TOKEN_EXCHANGES_TOTAL};

/// Create authentication router
///
/// Routes:
/// - GET /login - Redirect to Spotify
/// - GET /callback - OAuth callback
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
}

/// 302 Found to `location`
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// GET /login
///
/// Redirects the browser to the Spotify authorize page.
async fn login(State(state): State<AppState>) -> Result<Response, AppError> {
    let url = spotify::authorize_url(&state.config.spotify)?;
    OAUTH_LOGINS_TOTAL.inc();
    Ok(found(url.as_str()))
}

/// Query parameters from the Spotify callback
#[derive(Debug, Deserialize)]
struct CallbackQuery {
    /// Authorization code
    code: Option<String>,
    /// Set instead of `code` when the user denied access
    error: Option<String>,
}

/// GET /callback
///
/// # Steps
/// 1. Reject denied or code-less callbacks
/// 2. Exchange code for tokens
/// 3. Redirect to the front-end with tokens in the fragment
async fn callback(
    State(state): State<AppState>,
    query: Result<Query<CallbackQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;

    if let Some(error) = query.error {
        return Err(AppError::AuthorizationDenied(error));
    }

    let code = query
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| AppError::Validation("Missing authorization code".to_string()))?;

    let config = &state.config.spotify;
    match spotify::exchange_code(&state.http_client, config, &code).await {
        Ok(tokens) => {
            OAUTH_TOKEN_EXCHANGES_TOTAL
                .with_label_values(&["success"])
                .inc();
            tracing::info!(
                expires_in = ?tokens.expires_in,
                "Authorization code exchanged"
            );
            Ok(found(&spotify::frontend_redirect(config, &tokens)))
        }
        Err(error) => {
            OAUTH_TOKEN_EXCHANGES_TOTAL
                .with_label_values(&[error.kind()])
                .inc();
            Err(error.into())
        }
    }
}

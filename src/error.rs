//! Error types for makin-music-backend
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.
//! Every response body has the shape `{"error": "<public message>"}`;
//! internal details are logged, never sent to the client.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Failure of the server-to-server authorization code exchange
#[derive(Debug, Error)]
pub enum TokenExchangeError {
    /// The provider did not answer within the configured timeout
    #[error("token endpoint timed out")]
    Timeout,

    /// Connection or transport failure
    #[error("token endpoint unreachable: {0}")]
    Network(#[source] reqwest::Error),

    /// The provider answered with a non-success status
    #[error("token endpoint rejected the exchange with status {status}: {error}")]
    Rejected { status: StatusCode, error: String },

    /// The provider answered 2xx but the body was not a token response
    #[error("token endpoint returned a malformed body: {0}")]
    MalformedResponse(String),
}

impl TokenExchangeError {
    /// Classify a transport-level failure from the HTTP client
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::Network(err)
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Rejected { status, .. } if status.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Network(_) | Self::Rejected { .. } | Self::MalformedResponse(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            Self::Timeout => "Token exchange timed out",
            Self::Rejected { status, .. } if status.is_client_error() => {
                "Authorization code was rejected"
            }
            _ => "Token exchange failed",
        }
    }

    /// Label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Network(_) => "network",
            Self::Rejected { .. } => "rejected",
            Self::MalformedResponse(_) => "malformed_response",
        }
    }
}

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found (404)
    #[error("Resource not found")]
    NotFound,

    /// The route exists but not for this method (405)
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Validation error (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Request body over the configured limit (413)
    #[error("Request body too large")]
    PayloadTooLarge,

    /// The user or provider refused the authorization request (400)
    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    /// Upstream token exchange error (400/502/504)
    #[error("Token exchange error: {0}")]
    TokenExchange(#[from] TokenExchangeError),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Two route modules resolve to the same mount path
    #[error("Route conflict: {0}")]
    RouteConflict(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge
        } else {
            AppError::Validation(rejection.body_text())
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl AppError {
    /// Status code, public message and metric label for this error
    fn classify(&self) -> (StatusCode, String, &'static str) {
        match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string(), "not_found"),
            AppError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                self.to_string(),
                "method_not_allowed",
            ),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), "validation"),
            AppError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                self.to_string(),
                "payload_too_large",
            ),
            AppError::AuthorizationDenied(reason) => (
                StatusCode::BAD_REQUEST,
                format!("Authorization denied: {reason}"),
                "authorization_denied",
            ),
            AppError::TokenExchange(err) => {
                (err.status(), err.public_message().to_string(), "token_exchange")
            }
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
                "database",
            ),
            AppError::Config(_) | AppError::RouteConflict(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                "config",
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                "internal",
            ),
        }
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to its HTTP status code and a
    /// sanitized JSON error body.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_message, error_type) = self.classify();

        if status.is_server_error() {
            tracing::error!(error = %self, error_type, "Request failed");
        } else {
            tracing::debug!(error = %self, error_type, "Request rejected");
        }

        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[error_type]).inc();

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

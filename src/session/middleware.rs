//! Session middleware and extractor
//!
//! The layer resolves the session cookie before the handler runs and
//! writes the session back afterwards. A session that was never
//! modified is neither saved nor given a cookie.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::{Serialize, de::DeserializeOwned};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::cookie::{generate_session_id, sign_session_id, unsign_session_cookie};
use super::store::SessionRecord;
use crate::AppState;
use crate::config::SessionConfig;
use crate::error::AppError;

#[derive(Debug)]
struct SessionState {
    id: Option<String>,
    record: SessionRecord,
    modified: bool,
    destroyed: bool,
}

/// Handle to the current request's session
///
/// Cloning shares the same underlying session.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<Mutex<SessionState>>,
}

enum Outcome {
    Unchanged,
    Save { id: String, record: SessionRecord },
    Destroy { id: String },
}

impl Session {
    fn new(existing: Option<(String, SessionRecord)>) -> Self {
        let (id, record) = match existing {
            Some((id, record)) => (Some(id), record),
            None => (None, SessionRecord::new()),
        };

        Self {
            inner: Arc::new(Mutex::new(SessionState {
                id,
                record,
                modified: false,
                destroyed: false,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Session id, if the session has been stored before
    pub fn id(&self) -> Option<String> {
        self.state().id.clone()
    }

    /// Read a value, deserialized into `T`
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let state = self.state();
        let value = state.record.data.get(key)?.clone();
        serde_json::from_value(value).ok()
    }

    /// Store a value under `key`
    pub fn insert<T: Serialize>(&self, key: &str, value: T) -> Result<(), AppError> {
        let value = serde_json::to_value(value).map_err(|e| AppError::Internal(e.into()))?;
        let mut state = self.state();
        state.record.data.insert(key.to_string(), value);
        state.modified = true;
        state.destroyed = false;
        Ok(())
    }

    /// Remove a value, returning it if present
    pub fn remove(&self, key: &str) -> Option<serde_json::Value> {
        let mut state = self.state();
        let removed = state.record.data.remove(key);
        if removed.is_some() {
            state.modified = true;
        }
        removed
    }

    /// All stored key/value pairs
    pub fn entries(&self) -> serde_json::Map<String, serde_json::Value> {
        self.state().record.data.clone()
    }

    /// Drop the session from the store and clear the cookie
    pub fn destroy(&self) {
        let mut state = self.state();
        state.record = SessionRecord::new();
        state.modified = false;
        state.destroyed = true;
    }

    fn finish(&self) -> Outcome {
        let mut state = self.state();
        if state.destroyed {
            return match state.id.take() {
                Some(id) => Outcome::Destroy { id },
                None => Outcome::Unchanged,
            };
        }
        if !state.modified {
            return Outcome::Unchanged;
        }

        let id = state.id.get_or_insert_with(generate_session_id).clone();
        Outcome::Save {
            id,
            record: state.record.clone(),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Session>().cloned().ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("session layer is not installed"))
        })
    }
}

fn session_cookie(settings: &SessionConfig, value: String) -> Cookie<'static> {
    let max_age = i64::try_from(settings.max_age_seconds).unwrap_or(i64::MAX);

    Cookie::build((settings.cookie_name.clone(), value))
        .path("/")
        .http_only(true)
        .secure(settings.secure)
        .same_site(SameSite::None)
        .max_age(time::Duration::seconds(max_age))
        .build()
}

fn removal_cookie(settings: &SessionConfig) -> Cookie<'static> {
    let mut cookie = Cookie::build((settings.cookie_name.clone(), String::new()))
        .path("/")
        .http_only(true)
        .secure(settings.secure)
        .same_site(SameSite::None)
        .build();
    cookie.make_removal();
    cookie
}

/// Middleware that attaches a [`Session`] to every request
///
/// # Usage
/// ```ignore
/// let app = Router::new()
///     .route("/", get(handler))
///     .layer(middleware::from_fn_with_state(state, session_layer));
/// ```
pub async fn session_layer(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let settings = &state.config.session;

    let session_id = jar
        .get(&settings.cookie_name)
        .and_then(|cookie| unsign_session_cookie(cookie.value(), &settings.secret));

    let existing = match session_id {
        Some(id) => match state.sessions.load(&id).await {
            Ok(Some(record)) => Some((id, record)),
            Ok(None) => None,
            Err(e) => return e.into_response(),
        },
        None => None,
    };

    let session = Session::new(existing);
    request.extensions_mut().insert(session.clone());

    let response = next.run(request).await;

    match session.finish() {
        Outcome::Unchanged => response,
        Outcome::Save { id, record } => {
            if let Err(e) = state.sessions.save(&id, record).await {
                return e.into_response();
            }
            let signed = match sign_session_id(&id, &settings.secret) {
                Ok(signed) => signed,
                Err(e) => return e.into_response(),
            };
            tracing::debug!(session_id = %id, "Session saved");
            (CookieJar::new().add(session_cookie(settings, signed)), response).into_response()
        }
        Outcome::Destroy { id } => {
            if let Err(e) = state.sessions.destroy(&id).await {
                return e.into_response();
            }
            tracing::debug!(session_id = %id, "Session destroyed");
            (CookieJar::new().add(removal_cookie(settings)), response).into_response()
        }
    }
}

//! Session storage
//!
//! `SessionStore` is the seam for swapping in a shared store when the
//! service runs as more than one instance. `MemoryStore` keeps sessions
//! in process memory and is cleared on restart.

use axum::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::AppError;

/// Data persisted for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Arbitrary key/value data set by handlers
    pub data: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new() -> Self {
        Self {
            data: serde_json::Map::new(),
            created_at: Utc::now(),
        }
    }
}

impl Default for SessionRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Backing store for server-side sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch a live session by id
    async fn load(&self, id: &str) -> Result<Option<SessionRecord>, AppError>;

    /// Insert or replace a session
    async fn save(&self, id: &str, record: SessionRecord) -> Result<(), AppError>;

    /// Remove a session
    async fn destroy(&self, id: &str) -> Result<(), AppError>;

    /// Drop expired sessions
    async fn sweep(&self);

    /// Number of sessions currently held
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory session store
///
/// Sessions expire `ttl` after they were last saved.
/// Uses Moka for concurrent access and expiry.
pub struct MemoryStore {
    sessions: Cache<String, SessionRecord>,
}

impl MemoryStore {
    /// Create new memory store
    ///
    /// # Arguments
    /// * `ttl` - Session lifetime
    pub fn new(ttl: Duration) -> Self {
        let sessions = Cache::builder().time_to_live(ttl).build();
        Self { sessions }
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self, id: &str) -> Result<Option<SessionRecord>, AppError> {
        Ok(self.sessions.get(id).await)
    }

    async fn save(&self, id: &str, record: SessionRecord) -> Result<(), AppError> {
        self.sessions.insert(id.to_string(), record).await;
        Ok(())
    }

    async fn destroy(&self, id: &str) -> Result<(), AppError> {
        self.sessions.invalidate(id).await;
        Ok(())
    }

    async fn sweep(&self) {
        self.sessions.run_pending_tasks().await;
    }

    fn len(&self) -> u64 {
        self.sessions.entry_count()
    }
}

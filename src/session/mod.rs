//! Server-side sessions
//!
//! Handles:
//! - Signed session cookies
//! - Pluggable session storage (in-memory by default)
//! - Session middleware and extractor

mod cookie;
mod middleware;
mod store;

pub use cookie::{generate_session_id, sign_session_id, unsign_session_cookie};
pub use middleware::{Session, session_layer};
pub use store::{MemoryStore, SessionRecord, SessionStore};

//! Spotify OAuth bridge
//!
//! Handles:
//! - Redirect to the Spotify authorize page
//! - Authorization code exchange on callback

mod oauth;
pub mod spotify;

pub use oauth::auth_router;

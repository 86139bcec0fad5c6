//! Signed session cookie values
//!
//! Cookie format: `s:<id>.<base64(hmac_sha256(id))>`
//! Only the id travels in the cookie; the data stays in the store.

use base64::{Engine as _, engine::general_purpose};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

const SIGNED_PREFIX: &str = "s:";

/// Generate a fresh random session id
pub fn generate_session_id() -> String {
    let mut bytes = [0_u8; 24];
    rand::thread_rng().fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn mac_for(secret: &str) -> Result<HmacSha256, AppError> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid session secret: {e}")))
}

/// Sign a session id for use as a cookie value
///
/// # Arguments
/// * `id` - Session id
/// * `secret` - HMAC secret key
pub fn sign_session_id(id: &str, secret: &str) -> Result<String, AppError> {
    let mut mac = mac_for(secret)?;
    mac.update(id.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{SIGNED_PREFIX}{id}.{signature_b64}"))
}

/// Verify a signed cookie value and return the session id
///
/// Returns `None` for unsigned, malformed or tampered values.
pub fn unsign_session_cookie(value: &str, secret: &str) -> Option<String> {
    let signed = value.strip_prefix(SIGNED_PREFIX)?;
    let (id, signature_b64) = signed.rsplit_once('.')?;
    if id.is_empty() {
        return None;
    }

    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .ok()?;

    let mut mac = mac_for(secret).ok()?;
    mac.update(id.as_bytes());
    mac.verify_slice(&signature).ok()?;

    Some(id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "session-secret-for-unit-tests-000";

    #[test]
    fn signed_value_verifies() {
        let value = sign_session_id("abc123", SECRET).unwrap();
        assert!(value.starts_with("s:abc123."));
        assert_eq!(
            unsign_session_cookie(&value, SECRET).as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn tampered_id_is_rejected() {
        let value = sign_session_id("abc123", SECRET).unwrap();
        let tampered = value.replacen("abc123", "abc124", 1);
        assert_eq!(unsign_session_cookie(&tampered, SECRET), None);
    }

    #[test]
    fn other_secret_is_rejected() {
        let value = sign_session_id("abc123", SECRET).unwrap();
        assert_eq!(
            unsign_session_cookie(&value, "another-secret-for-unit-tests-00"),
            None
        );
    }

    #[test]
    fn unsigned_and_malformed_values_are_rejected() {
        assert_eq!(unsign_session_cookie("abc123", SECRET), None);
        assert_eq!(unsign_session_cookie("s:abc123", SECRET), None);
        assert_eq!(unsign_session_cookie("s:.c2ln", SECRET), None);
        assert_eq!(unsign_session_cookie("s:abc123.!!!", SECRET), None);
    }

    #[test]
    fn generated_ids_are_unique() {
        let first = generate_session_id();
        let second = generate_session_id();
        assert_ne!(first, second);
        assert_eq!(first.len(), 32);
    }
}

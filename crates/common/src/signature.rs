//! HMAC-SHA256 signatures for outbound webhook payloads.
//!
//! Receivers recompute the digest over the JSON body (minus the `signature`
//! field) with their copy of the shared secret and compare.

use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;

use crate::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

/// Length of a hex-encoded signature.
pub const SIGNATURE_LEN: usize = 64;

/// Sign raw bytes, returning the lowercase hex digest.
#[must_use]
#[allow(clippy::expect_used)] // HMAC accepts any key size, this cannot fail
pub fn sign(body: &[u8], secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Sign a JSON object as it would be serialized on the wire.
pub fn sign_payload(payload: &Map<String, Value>, secret: &str) -> AppResult<String> {
    let body = serde_json::to_vec(payload)
        .map_err(|e| AppError::Internal(format!("Failed to serialize payload: {e}")))?;
    Ok(sign(&body, secret))
}

/// Check a hex signature against `body` in constant time.
#[must_use]
#[allow(clippy::expect_used)] // HMAC accepts any key size, this cannot fail
pub fn verify(body: &[u8], secret: &str, signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> Map<String, Value> {
        json!({
            "event": "alert.created",
            "timestamp": "2026-01-05T10:00:00+00:00",
            "data": { "site_id": "01hq", "severity": "critical" }
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn test_signature_is_deterministic() {
        let first = sign_payload(&payload(), "s3cret").unwrap();
        let second = sign_payload(&payload(), "s3cret").unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), SIGNATURE_LEN);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_signature_depends_on_secret_and_body() {
        let base = sign(b"{\"a\":1}", "one");
        assert_ne!(base, sign(b"{\"a\":1}", "two"));
        assert_ne!(base, sign(b"{\"a\":2}", "one"));
    }

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2.
        assert_eq!(
            sign(b"what do ya want for nothing?", "Jefe"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_verify() {
        let body = serde_json::to_vec(&payload()).unwrap();
        let signature = sign(&body, "s3cret");

        assert!(verify(&body, "s3cret", &signature));
        assert!(!verify(&body, "other", &signature));
        assert!(!verify(&body, "s3cret", "not-hex"));
    }
}

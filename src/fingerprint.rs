//! Request fingerprinting
//!
//! A fingerprint is the correlation key of a handshake: the backend ties the
//! serial token and the poll queries together by this digest, and the
//! embedded surface receives it in its URL.

use serde::Serialize;
use sha2::{Digest, Sha512};
use std::fmt::Write;

/// Length of a fingerprint in hex characters (SHA-512 digest)
pub const FINGERPRINT_LEN: usize = 128;

/// Canonical input pair, serialized in this exact field order
#[derive(Serialize)]
struct FingerprintInput<'a> {
    #[serde(rename = "appId")]
    app_id: &'a str,
    params: &'a str,
}

/// Deterministic digest of a request's identity
///
/// Serializes `{appId, params}` as canonical JSON, hashes the UTF-8 bytes
/// with SHA-512 and returns the lowercase hex digest.
///
/// # Panics
///
/// Panics if JSON serialization of the two strings fails, which cannot
/// happen for valid UTF-8 input.
#[must_use]
pub fn request_fingerprint(app_id: &str, params: &str) -> String {
    let canonical = serde_json::to_string(&FingerprintInput { app_id, params })
        .expect("string pair always serializes");
    let digest = Sha512::digest(canonical.as_bytes());
    let mut hex = String::with_capacity(FINGERPRINT_LEN);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

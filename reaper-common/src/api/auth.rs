//! Password hashing and session token generation
//!
//! # Password Storage
//!
//! - Each user gets a random 16-byte salt (stored hex-encoded)
//! - Hash is SHA-256 over `salt_hex || password`, stored as 64 lowercase hex chars
//! - Verification compares digests in constant time
//!
//! # Session Tokens
//!
//! - Opaque 32-byte random values, hex-encoded (64 chars)
//! - The token is the only thing stored in the client cookie
//!
//! Pure functions only. Cookie handling lives in the web crate.

use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Salt length in bytes before hex encoding
pub const SALT_LEN: usize = 16;

/// Session token length in bytes before hex encoding
pub const SESSION_TOKEN_LEN: usize = 32;

/// Session lifetime: 7 days
pub const SESSION_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 7;

/// Generate a new random salt (hex-encoded)
pub fn generate_salt() -> String {
    random_hex(SALT_LEN)
}

/// Generate a new random session token (hex-encoded)
pub fn generate_session_token() -> String {
    random_hex(SESSION_TOKEN_LEN)
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hash a password with the given salt
///
/// # Examples
///
/// ```
/// use reaper_common::api::auth::hash_password;
///
/// let hash = hash_password("hunter2", "00ff");
/// assert_eq!(hash.len(), 64);
/// assert_eq!(hash, hash_password("hunter2", "00ff"));
/// assert_ne!(hash, hash_password("hunter2", "ff00"));
/// ```
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Check a password against a stored hash and salt
pub fn verify_password(password: &str, salt: &str, stored_hash: &str) -> bool {
    let calculated = hash_password(password, salt);
    digests_match(&calculated, stored_hash)
}

/// Constant-time comparison of two digest strings
///
/// Lengths are compared first; that leaks only the length of a fixed-format digest.
pub fn digests_match(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}

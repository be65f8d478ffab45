//! Random identifiers, API key secrets and secret hashing.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Prefix of every API key secret.
pub const API_KEY_PREFIX: &str = "tm_";

/// Prefix of every API key identifier.
pub const API_KEY_ID_PREFIX: &str = "ak_";

/// Length of generated record identifiers.
pub const ID_LENGTH: usize = 24;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generates a random, URL-safe identifier.
///
/// Lowercase alphanumeric, starting with a letter. Identifiers carry no
/// ordering information.
#[must_use]
pub fn generate_id() -> String {
    random_string(ID_LENGTH)
}

/// Generates a new API key secret (`tm_` followed by 48 characters).
#[must_use]
pub fn generate_api_key() -> String {
    format!("{API_KEY_PREFIX}{}", random_string(ID_LENGTH * 2))
}

/// Generates a new API key identifier (`ak_` followed by 24 characters).
#[must_use]
pub fn generate_api_key_id() -> String {
    format!("{API_KEY_ID_PREFIX}{}", random_string(ID_LENGTH))
}

fn random_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|i| {
            let alphabet = if i == 0 { LETTERS } else { ALPHABET };
            char::from(alphabet[rng.gen_range(0..alphabet.len())])
        })
        .collect()
}

/// Hashes a secret with SHA-256, as lowercase hex.
#[must_use]
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Compares two strings without short-circuiting on the first difference.
///
/// Only the length is allowed to leak.
#[must_use]
pub fn secure_compare(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Checks a plaintext secret against a stored [`hash_secret`] digest.
#[must_use]
pub fn verify_secret(plaintext: &str, stored_hash: &str) -> bool {
    secure_compare(&hash_secret(plaintext), stored_hash)
}

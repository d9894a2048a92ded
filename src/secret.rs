//! Secret generation and comparison.

use rand::rngs::OsRng;
use rand::RngCore;

const SECRET_LEN_BYTES: usize = 16;

/// Generate a random 128 bit secret, hex encoded.
#[must_use]
pub fn generate_secret() -> String {
    let mut raw = [0_u8; SECRET_LEN_BYTES];
    OsRng.fill_bytes(&mut raw);
    hex::encode(raw)
}

/// Compare two secrets in time independent of where they first differ.
///
/// Only the length is leaked, which for generated secrets is public anyway.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0_u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

//! Salted, iterated SHA-256 password hashes: `sha256$<iterations>$<salt>$<hex digest>`.

use crate::error::AppError;
use sha2::{Digest, Sha256};

const ALGORITHM: &str = "sha256";
pub const DEFAULT_ITERATIONS: u32 = 100_000;

fn digest(password: &str, salt: &str, iterations: u32) -> String {
    let mut acc: Vec<u8> = Sha256::new()
        .chain_update(salt.as_bytes())
        .chain_update(password.as_bytes())
        .finalize()
        .to_vec();
    for _ in 1..iterations {
        acc = Sha256::new()
            .chain_update(&acc)
            .chain_update(password.as_bytes())
            .finalize()
            .to_vec();
    }
    hex::encode(acc)
}

/// Hash with a fresh random salt.
pub fn hash_password(password: &str, iterations: u32) -> String {
    hash_with(password, &uuid::Uuid::new_v4().simple().to_string(), iterations.max(1))
}

pub fn hash_with(password: &str, salt: &str, iterations: u32) -> String {
    format!("{}${}${}${}", ALGORITHM, iterations, salt, digest(password, salt, iterations))
}

/// Constant-time check against a stored hash. Malformed hashes never verify.
pub fn verify_password(password: &str, encoded: &str) -> bool {
    let mut parts = encoded.splitn(4, '$');
    let (Some(alg), Some(iter), Some(salt), Some(expected)) = (parts.next(), parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    if alg != ALGORITHM {
        return false;
    }
    let Ok(iterations) = iter.parse::<u32>() else {
        return false;
    };
    if iterations == 0 {
        return false;
    }
    let actual = digest(password, salt, iterations);
    constant_time_eq(actual.as_bytes(), expected.as_bytes())
}

/// Stand-in hash verified for unknown usernames so their login costs the same as a real one.
pub fn decoy_hash(iterations: u32) -> String {
    format!("{}${}$decoy${}", ALGORITHM, iterations.max(1), "0".repeat(64))
}

/// [`hash_password`] on the blocking pool; the iteration loop must not stall the runtime.
pub async fn hash_password_blocking(password: String, iterations: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password, iterations))
        .await
        .map_err(|e| AppError::Internal(format!("password hashing task failed: {}", e)))
}

/// [`verify_password`] on the blocking pool.
pub async fn verify_password_blocking(password: String, encoded: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &encoded))
        .await
        .map_err(|e| AppError::Internal(format!("password check task failed: {}", e)))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

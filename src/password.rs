//! One-way password hashing.
//!
//! Argon2id with a fresh random salt per hash; hashes are stored as PHC
//! strings, so the salt and parameters travel with the hash itself.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::{StoreError, StoreResult};

pub fn hash_password(password: &str) -> StoreResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StoreError::Hashing(e.to_string()))
}

/// Returns `Ok(false)` on a mismatch; `Err` only when the stored hash is unreadable.
pub fn verify_password(password: &str, hash: &str) -> StoreResult<bool> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| StoreError::Hashing(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Hashes on the blocking pool so request workers are not stalled by Argon2.
pub async fn hash_password_blocking(password: String) -> StoreResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| StoreError::Hashing(format!("hashing task failed: {}", e)))?
}

pub async fn verify_password_blocking(password: String, hash: String) -> StoreResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| StoreError::Hashing(format!("verification task failed: {}", e)))?
}

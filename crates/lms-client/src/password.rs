//! Argon2 password hashing shared by the account and librarian stores.
//!
//! Hashing is slow on purpose, so the async entry points run it on the
//! blocking pool. The `_blocking` variants are for sync seeding code.

use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};

use crate::backend::BackendError;

/// Hash a password into an Argon2 PHC string with a fresh random salt.
pub async fn hash_password(password: &str) -> Result<String, BackendError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash_password_blocking(&password))
        .await
        .map_err(|e| BackendError::Other(format!("password hashing task failed: {e}")))?
}

/// Check a password against a stored PHC string. Malformed hashes never verify.
pub async fn verify_password(phc: &str, password: &str) -> Result<bool, BackendError> {
    let phc = phc.to_string();
    let password = password.to_string();
    tokio::task::spawn_blocking(move || verify_password_blocking(&phc, &password))
        .await
        .map_err(|e| BackendError::Other(format!("password check task failed: {e}")))
}

pub fn hash_password_blocking(password: &str) -> Result<String, BackendError> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| BackendError::Other(e.to_string()))?;
    let salt =
        SaltString::encode_b64(&salt_bytes).map_err(|e| BackendError::Other(e.to_string()))?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| BackendError::Other(e.to_string()))?
        .to_string();
    Ok(phc)
}

pub fn verify_password_blocking(phc: &str, password: &str) -> bool {
    match PasswordHash::new(phc) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

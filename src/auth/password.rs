//! bcrypt password hashing.
//!
//! Both operations are CPU-bound and run on the blocking pool so they never
//! stall the async workers.

use tokio::task;

use crate::error::AppResult;

/// Hash a plaintext password with a fresh salt.
pub async fn hash_password(password: &str, cost: u32) -> AppResult<String> {
    let password = password.to_string();
    let hash = task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hash)
}

/// Check a plaintext password against a stored hash.
///
/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    let password = password.to_string();
    let password_hash = password_hash.to_string();
    let matches = task::spawn_blocking(move || {
        bcrypt::verify(password, &password_hash).unwrap_or_else(|e| {
            tracing::warn!("Stored password hash could not be parsed: {}", e);
            false
        })
    })
    .await?;
    Ok(matches)
}

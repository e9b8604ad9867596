//! bcrypt hashing and verification, run on the blocking thread pool so a hash
//! never occupies an async worker.

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("bcrypt: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),

    #[error("Hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Salted one-way hash of a plaintext password.
pub async fn hash_password(plaintext: &str, cost: u32) -> Result<String, PasswordError> {
    let plaintext = plaintext.to_string();
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(plaintext, cost)).await??;
    Ok(hash)
}

/// Constant-time check of a plaintext password against a stored bcrypt hash.
/// Errors only when the stored hash itself is malformed.
pub async fn verify_password(plaintext: &str, hash: &str) -> Result<bool, PasswordError> {
    let plaintext = plaintext.to_string();
    let hash = hash.to_string();
    let matches = tokio::task::spawn_blocking(move || bcrypt::verify(plaintext, &hash)).await??;
    Ok(matches)
}

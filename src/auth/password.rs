/// Password Hashing and Verification
///
/// Handles password hashing with argon2id. The produced hash is a
/// self-describing PHC string: algorithm parameters and a per-call
/// random salt are embedded, so identical passwords never hash to the
/// same string.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, SaltString};
use argon2::{Argon2, PasswordVerifier};

use crate::error::AppError;

/// Hash a password using argon2id
///
/// # Errors
/// Returns error only on an internal hashing failure; the plaintext is
/// never logged or persisted.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its hash
///
/// Returns `Ok(false)` for a legitimate mismatch. An error means the
/// stored hash string itself is malformed and cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Malformed password hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::Internal(format!(
            "Password verification failed: {}",
            e
        ))),
    }
}

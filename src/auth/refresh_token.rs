/// Refresh Token Management
///
/// Handles opaque refresh token generation, storage, validation, and
/// revocation. Refresh tokens are:
/// - 32 cryptographically secure random bytes, hex-encoded (256 bits)
/// - Hashed with SHA-256 before storage (never store plaintext)
/// - Valid for repeated use until expiry or explicit revocation
/// - Database-backed for revocation support

use chrono::{Duration, Utc};
use rand::{thread_rng, RngCore};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AuthError};

/// Generate a new cryptographically secure refresh token
///
/// Returns the lowercase hex encoding of 32 random bytes. The token
/// carries no identity or expiry; both are bound by the database
/// record. The plaintext is what the client stores; the server keeps
/// only the SHA-256 digest. An exhausted randomness source panics:
/// that condition is fatal, not recoverable.
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; 32];
    thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Hash a refresh token using SHA-256
///
/// Never store plaintext tokens in the database.
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Save a refresh token to the database
///
/// # Arguments
/// * `pool` - Database connection pool
/// * `user_id` - User ID that owns this token
/// * `token` - Plaintext refresh token
/// * `expiry_seconds` - Token lifetime in seconds
///
/// # Errors
/// Returns error if the database operation fails
pub async fn save_refresh_token(
    pool: &PgPool,
    user_id: Uuid,
    token: &str,
    expiry_seconds: i64,
) -> Result<(), AppError> {
    let token_hash = hash_token(token);
    let expires_at = Utc::now() + Duration::seconds(expiry_seconds);

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(token_hash)
    .bind(expires_at)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Validate a refresh token
///
/// Checks:
/// 1. Token exists in database
/// 2. Token has not been revoked
/// 3. Token has not expired
///
/// # Returns
/// User ID bound to the token if valid
///
/// # Errors
/// Returns an authentication error if the token is unknown, revoked,
/// or expired; all three collapse to the same 401 at the boundary.
pub async fn validate_refresh_token(pool: &PgPool, token: &str) -> Result<Uuid, AppError> {
    let token_hash = hash_token(token);

    let result = sqlx::query_as::<_, (Uuid, chrono::DateTime<Utc>, bool)>(
        r#"
        SELECT user_id, expires_at, is_revoked
        FROM refresh_tokens
        WHERE token_hash = $1
        "#,
    )
    .bind(&token_hash)
    .fetch_optional(pool)
    .await?;

    match result {
        None => {
            tracing::warn!("Refresh token not found in database");
            Err(AppError::Auth(AuthError::TokenInvalid))
        }
        Some((user_id, expires_at, is_revoked)) => {
            if is_revoked {
                tracing::warn!(user_id = %user_id, "Attempt to use revoked refresh token");
                return Err(AppError::Auth(AuthError::TokenRevoked));
            }

            if expires_at < Utc::now() {
                tracing::info!(user_id = %user_id, "Refresh token expired");
                return Err(AppError::Auth(AuthError::TokenExpired));
            }

            Ok(user_id)
        }
    }
}

/// Revoke a single refresh token
///
/// Idempotent: revoking an unknown or already-revoked token updates
/// zero rows and still succeeds.
///
/// # Errors
/// Returns error if the database operation fails
pub async fn revoke_refresh_token(pool: &PgPool, token: &str) -> Result<(), AppError> {
    let token_hash = hash_token(token);

    sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET is_revoked = true, revoked_at = $1
        WHERE token_hash = $2
        "#,
    )
    .bind(Utc::now())
    .bind(token_hash)
    .execute(pool)
    .await?;

    Ok(())
}

/// JWT Token Generation and Validation
///
/// Handles creation and validation of the short-lived signed access
/// tokens. Tokens are stateless: validity is derived entirely from the
/// HMAC-SHA-256 signature and the embedded timestamps, with no store
/// lookup on the hot path.

use actix_web::http::header::HeaderMap;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::auth::header::get_bearer_token;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

/// Generate a new access token for a user
///
/// # Errors
/// Returns error if signing fails (internal library error).
pub fn generate_access_token(user_id: &Uuid, config: &JwtSettings) -> Result<String, AppError> {
    let claims = Claims::new(*user_id, config.access_token_expiry, config.issuer.clone());

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Validate an access token and extract the user ID from its subject
///
/// Rejects tokens that are malformed, signed with a different secret,
/// carry the wrong issuer, have expired, or whose subject is not a
/// well-formed UUID. Expiry is checked strictly (no leeway): a token
/// issued with a zero validity window is already expired.
pub fn validate_access_token(token: &str, config: &JwtSettings) -> Result<Uuid, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);
    validation.leeway = 0;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::warn!("JWT validation error: {}", e);
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::Auth(AuthError::TokenExpired)
            }
            _ => AppError::Auth(AuthError::TokenInvalid),
        }
    })?;

    // The library treats exp == now as still valid; we do not.
    if data.claims.exp <= chrono::Utc::now().timestamp() {
        return Err(AppError::Auth(AuthError::TokenExpired));
    }

    data.claims.user_id()
}

/// Authenticate a request from its authorization header
///
/// Convenience for protected handlers: extracts the bearer token and
/// validates it in one step.
pub fn validate_access_token_from_headers(
    headers: &HeaderMap,
    config: &JwtSettings,
) -> Result<Uuid, AppError> {
    let token = get_bearer_token(headers)?;
    validate_access_token(&token, config)
}

/// Authentication Routes
///
/// The session protocol across three operations: login (verify
/// password, issue access token, persist refresh token), refresh
/// (trade a live refresh token for a new access token), and revoke
/// (invalidate a refresh token server-side).

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{
    generate_access_token, generate_refresh_token, get_bearer_token, revoke_refresh_token,
    save_refresh_token, validate_refresh_token, verify_password,
};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, ErrorContext};

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response: the user record plus both tokens
#[derive(Serialize)]
pub struct LoginResponse {
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
    pub email: String,
    pub is_chirpy_red: bool,
    pub token: String,
    pub refresh_token: String,
}

/// Refresh response carries only the new access token
#[derive(Serialize)]
pub struct RefreshResponse {
    pub token: String,
}

/// POST /api/login
///
/// Authenticate with email and password. Returns the user record, a
/// 1-hour access token, and a 60-day refresh token.
///
/// # Errors
/// - 401: Unknown email or wrong password (indistinguishable by design)
/// - 500: Internal server error
pub async fn login(
    form: web::Json<LoginRequest>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    let user = sqlx::query_as::<_, (Uuid, DateTime<Utc>, DateTime<Utc>, String, String, bool)>(
        r#"
        SELECT id, created_at, updated_at, email, hashed_password, is_chirpy_red
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(&form.email)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or(AppError::Auth(AuthError::InvalidCredentials))?;

    let (user_id, created_at, updated_at, email, hashed_password, is_chirpy_red) = user;

    // A hash that fails to parse counts as a mismatch here; the stored
    // record is the problem, not the caller, but the response must not
    // say which.
    let password_valid = verify_password(&form.password, &hashed_password).unwrap_or_else(|e| {
        tracing::error!(
            request_id = %context.request_id,
            user_id = %user_id,
            error = %e,
            "Stored password hash could not be verified"
        );
        false
    });
    if !password_valid {
        return Err(AppError::Auth(AuthError::InvalidCredentials));
    }

    let access_token = generate_access_token(&user_id, jwt_config.get_ref())?;
    let refresh_token = generate_refresh_token();

    save_refresh_token(
        pool.get_ref(),
        user_id,
        &refresh_token,
        jwt_config.refresh_token_expiry,
    )
    .await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user_id,
        "User logged in successfully"
    );

    Ok(HttpResponse::Ok().json(LoginResponse {
        id: user_id.to_string(),
        created_at: created_at.to_rfc3339(),
        updated_at: updated_at.to_rfc3339(),
        email,
        is_chirpy_red,
        token: access_token,
        refresh_token,
    }))
}

/// POST /api/refresh
///
/// Trade a refresh token (Authorization: Bearer <refresh_token>) for a
/// new access token. The refresh token is not rotated or consumed; it
/// stays valid until its own expiry or an explicit revoke.
///
/// # Errors
/// - 401: Missing/malformed header, unknown, expired, or revoked token
/// - 500: Internal server error
pub async fn refresh(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");

    let refresh_token = get_bearer_token(req.headers())?;
    let user_id = validate_refresh_token(pool.get_ref(), &refresh_token).await?;

    let access_token = generate_access_token(&user_id, jwt_config.get_ref())?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user_id,
        "Access token refreshed"
    );

    Ok(HttpResponse::Ok().json(RefreshResponse {
        token: access_token,
    }))
}

/// POST /api/revoke
///
/// Revoke the refresh token in the Authorization header. Idempotent:
/// an unknown or already-revoked token still yields 204.
///
/// # Errors
/// - 401: Missing or malformed Authorization header
/// - 500: Internal server error
pub async fn revoke(req: HttpRequest, pool: web::Data<PgPool>) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_revoke");

    let refresh_token = get_bearer_token(req.headers())?;
    revoke_refresh_token(pool.get_ref(), &refresh_token).await?;

    tracing::info!(
        request_id = %context.request_id,
        "Refresh token revoked"
    );

    Ok(HttpResponse::NoContent().finish())
}

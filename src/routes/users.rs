/// User Routes
///
/// Registration and credential updates. Registration returns the bare
/// user record; tokens are only issued by login.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{hash_password, validate_access_token_from_headers};
use crate::configuration::JwtSettings;
use crate::error::{AppError, ErrorContext, ValidationError};
use crate::validators::is_valid_email;

/// Request body shared by create and update
#[derive(Deserialize)]
pub struct UserBody {
    pub email: String,
    pub password: String,
}

/// User record as returned to clients (never includes the hash)
#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
    pub email: String,
    pub is_chirpy_red: bool,
}

impl UserResponse {
    fn new(
        id: Uuid,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        email: String,
        is_chirpy_red: bool,
    ) -> Self {
        Self {
            id: id.to_string(),
            created_at: created_at.to_rfc3339(),
            updated_at: updated_at.to_rfc3339(),
            email,
            is_chirpy_red,
        }
    }
}

/// POST /api/users
///
/// Register a new user with email and password.
///
/// # Errors
/// - 400: Invalid email format or empty password
/// - 409: Email already registered
/// - 500: Internal server error
pub async fn create_user(
    form: web::Json<UserBody>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");

    let email = is_valid_email(&form.email)?;
    if form.password.is_empty() {
        return Err(AppError::Validation(ValidationError::EmptyField(
            "password".to_string(),
        )));
    }
    let hashed_password = hash_password(&form.password)?;

    let user_id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO users (id, email, hashed_password, is_chirpy_red, created_at, updated_at)
        VALUES ($1, $2, $3, FALSE, $4, $5)
        "#,
    )
    .bind(user_id)
    .bind(&email)
    .bind(&hashed_password)
    .bind(now)
    .bind(now)
    .execute(pool.get_ref())
    .await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user_id,
        "User registered successfully"
    );

    Ok(HttpResponse::Created().json(UserResponse::new(user_id, now, now, email, false)))
}

/// PUT /api/users
///
/// Update the authenticated user's email and password.
/// Requires a valid access token in the Authorization header.
///
/// # Errors
/// - 400: Invalid email or empty password
/// - 401: Missing or invalid access token
/// - 404: Token subject no longer exists
/// - 409: New email already taken
/// - 500: Internal server error
pub async fn update_user(
    req: HttpRequest,
    form: web::Json<UserBody>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_update");

    let user_id = validate_access_token_from_headers(req.headers(), jwt_config.get_ref())?;

    let email = is_valid_email(&form.email)?;
    if form.password.is_empty() {
        return Err(AppError::Validation(ValidationError::EmptyField(
            "password".to_string(),
        )));
    }
    let hashed_password = hash_password(&form.password)?;

    let (created_at, updated_at, is_chirpy_red) =
        sqlx::query_as::<_, (DateTime<Utc>, DateTime<Utc>, bool)>(
            r#"
            UPDATE users
            SET email = $1, hashed_password = $2, updated_at = $3
            WHERE id = $4
            RETURNING created_at, updated_at, is_chirpy_red
            "#,
        )
        .bind(&email)
        .bind(&hashed_password)
        .bind(Utc::now())
        .bind(user_id)
        .fetch_one(pool.get_ref())
        .await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user_id,
        "User credentials updated"
    );

    Ok(HttpResponse::Ok().json(UserResponse::new(
        user_id,
        created_at,
        updated_at,
        email,
        is_chirpy_red,
    )))
}

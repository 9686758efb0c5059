/// Chirp Routes
///
/// Creation (with content moderation), listing, and single-chirp
/// lookup. Creation is bound to the authenticated user from the access
/// token, never to an id supplied in the body.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::validate_access_token_from_headers;
use crate::configuration::JwtSettings;
use crate::error::{AppError, DatabaseError, ErrorContext, ValidationError};

const MAX_CHIRP_LENGTH: usize = 140;
const PROFANE_WORDS: [&str; 3] = ["kerfuffle", "sharbert", "fornax"];

/// Chirp creation request
#[derive(Deserialize)]
pub struct ChirpBody {
    pub body: String,
}

/// Chirp record as returned to clients
#[derive(Serialize)]
pub struct ChirpResponse {
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
    pub body: String,
    pub user_id: String,
}

impl ChirpResponse {
    fn new(
        id: Uuid,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        body: String,
        user_id: Uuid,
    ) -> Self {
        Self {
            id: id.to_string(),
            created_at: created_at.to_rfc3339(),
            updated_at: updated_at.to_rfc3339(),
            body,
            user_id: user_id.to_string(),
        }
    }
}

/// Reject over-long chirps and censor profane words.
///
/// Words are space-delimited; matching is case-insensitive but a word
/// with attached punctuation is left alone.
fn sanitize_chirp_body(body: &str) -> Result<String, AppError> {
    if body.len() > MAX_CHIRP_LENGTH {
        return Err(AppError::Validation(ValidationError::TooLong(
            "chirp".to_string(),
            MAX_CHIRP_LENGTH,
        )));
    }

    let cleaned = body
        .split(' ')
        .map(|word| {
            if PROFANE_WORDS.contains(&word.to_lowercase().as_str()) {
                "****"
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    Ok(cleaned)
}

/// POST /api/chirps
///
/// Create a chirp owned by the authenticated user.
///
/// # Errors
/// - 400: Body longer than 140 characters
/// - 401: Missing or invalid access token
/// - 500: Internal server error
pub async fn create_chirp(
    req: HttpRequest,
    form: web::Json<ChirpBody>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("chirp_create");

    let user_id = validate_access_token_from_headers(req.headers(), jwt_config.get_ref())?;
    let body = sanitize_chirp_body(&form.body)?;

    let chirp_id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO chirps (id, body, user_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(chirp_id)
    .bind(&body)
    .bind(user_id)
    .bind(now)
    .bind(now)
    .execute(pool.get_ref())
    .await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user_id,
        chirp_id = %chirp_id,
        "Chirp created"
    );

    Ok(HttpResponse::Created().json(ChirpResponse::new(chirp_id, now, now, body, user_id)))
}

/// GET /api/chirps
///
/// List all chirps, oldest first.
pub async fn list_chirps(pool: web::Data<PgPool>) -> Result<HttpResponse, AppError> {
    let chirps = sqlx::query_as::<_, (Uuid, DateTime<Utc>, DateTime<Utc>, String, Uuid)>(
        r#"
        SELECT id, created_at, updated_at, body, user_id
        FROM chirps
        ORDER BY created_at ASC
        "#,
    )
    .fetch_all(pool.get_ref())
    .await?
    .into_iter()
    .map(|(id, created_at, updated_at, body, user_id)| {
        ChirpResponse::new(id, created_at, updated_at, body, user_id)
    })
    .collect::<Vec<_>>();

    Ok(HttpResponse::Ok().json(chirps))
}

/// GET /api/chirps/{chirp_id}
///
/// Fetch a single chirp.
///
/// # Errors
/// - 400: Malformed chirp id
/// - 404: No such chirp
pub async fn get_chirp(
    path: web::Path<String>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let chirp_id = Uuid::parse_str(&path.into_inner()).map_err(|_| {
        AppError::Validation(ValidationError::InvalidFormat("chirp id".to_string()))
    })?;

    let chirp = sqlx::query_as::<_, (Uuid, DateTime<Utc>, DateTime<Utc>, String, Uuid)>(
        r#"
        SELECT id, created_at, updated_at, body, user_id
        FROM chirps
        WHERE id = $1
        "#,
    )
    .bind(chirp_id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::Database(DatabaseError::NotFound("Chirp not found".to_string())))?;

    let (id, created_at, updated_at, body, user_id) = chirp;
    Ok(HttpResponse::Ok().json(ChirpResponse::new(id, created_at, updated_at, body, user_id)))
}

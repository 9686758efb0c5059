/// Payment Webhook Routes
///
/// Polka notifies Chirpy of account upgrades. The webhook is
/// authenticated with a shared API key (Authorization: ApiKey <key>);
/// events other than `user.upgraded` are acknowledged and ignored.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::get_api_key;
use crate::configuration::PolkaSettings;
use crate::error::{AppError, AuthError, DatabaseError, ErrorContext, ValidationError};

const EVENT_USER_UPGRADED: &str = "user.upgraded";

#[derive(Deserialize)]
pub struct PolkaEventData {
    pub user_id: String,
}

#[derive(Deserialize)]
pub struct PolkaEvent {
    pub event: String,
    pub data: PolkaEventData,
}

/// POST /api/polka/webhooks
///
/// # Errors
/// - 400: Malformed user id in the event payload
/// - 401: Missing or wrong API key
/// - 404: Upgraded user does not exist
/// - 500: Internal server error
pub async fn polka_webhook(
    req: HttpRequest,
    event: web::Json<PolkaEvent>,
    pool: web::Data<PgPool>,
    polka_config: web::Data<PolkaSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("polka_webhook");

    let api_key = get_api_key(req.headers())?;
    if api_key != polka_config.key {
        return Err(AppError::Auth(AuthError::InvalidApiKey));
    }

    if event.event != EVENT_USER_UPGRADED {
        return Ok(HttpResponse::NoContent().finish());
    }

    let user_id = Uuid::parse_str(&event.data.user_id).map_err(|_| {
        AppError::Validation(ValidationError::InvalidFormat("user_id".to_string()))
    })?;

    let result = sqlx::query(
        r#"
        UPDATE users
        SET is_chirpy_red = TRUE, updated_at = $1
        WHERE id = $2
        "#,
    )
    .bind(chrono::Utc::now())
    .bind(user_id)
    .execute(pool.get_ref())
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::Database(DatabaseError::NotFound(
            "User not found".to_string(),
        )));
    }

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user_id,
        "User upgraded to Chirpy Red"
    );

    Ok(HttpResponse::NoContent().finish())
}

/// Admin Routes
///
/// Operational scaffolding: the file server hit counter page and a
/// development-only reset that wipes users (chirps and refresh tokens
/// go with them via cascading deletes).

use actix_web::{web, HttpResponse};
use sqlx::PgPool;

use crate::error::AppError;
use crate::state::AppMetrics;

/// GET /admin/metrics
pub async fn metrics(metrics: web::Data<AppMetrics>) -> HttpResponse {
    let body = format!(
        r#"<html>

<body>
    <h1>Welcome, Chirpy Admin</h1>
    <p>Chirpy has been visited {} times!</p>
</body>

</html>"#,
        metrics.hits()
    );

    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}

/// POST /admin/reset
///
/// Zero the hit counter and delete all users. Development convenience;
/// never expose this in production.
pub async fn reset(
    metrics: web::Data<AppMetrics>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    metrics.reset();

    sqlx::query("DELETE FROM users").execute(pool.get_ref()).await?;

    tracing::info!("Hit counter and user table reset");

    Ok(HttpResponse::Ok().finish())
}

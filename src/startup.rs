use actix_files as fs;
use actix_web::{web, App, HttpServer};
use sqlx::PgPool;
use std::net::TcpListener;
use actix_web::dev::Server;

use crate::configuration::Settings;
use crate::middleware::MetricsMiddleware;
use crate::routes::{
    create_chirp, create_user, get_chirp, health_check, list_chirps, login, metrics,
    polka_webhook, refresh, reset, revoke, update_user,
};
use crate::state::AppMetrics;

pub fn run(
    listener: TcpListener,
    connection: PgPool,
    settings: Settings,
) -> Result<Server, std::io::Error> {
    let connection = web::Data::new(connection);
    let jwt_config = web::Data::new(settings.jwt.clone());
    let polka_config = web::Data::new(settings.polka.clone());
    let app_metrics = web::Data::new(AppMetrics::new());

    let server = HttpServer::new(move || {
        App::new()
            // Shared state
            .app_data(connection.clone())
            .app_data(jwt_config.clone())
            .app_data(polka_config.clone())
            .app_data(app_metrics.clone())

            // JSON API
            .service(
                web::scope("/api")
                    .route("/healthz", web::get().to(health_check))
                    .service(
                        web::resource("/users")
                            .route(web::post().to(create_user))
                            .route(web::put().to(update_user)),
                    )
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    .route("/revoke", web::post().to(revoke))
                    .service(
                        web::resource("/chirps")
                            .route(web::post().to(create_chirp))
                            .route(web::get().to(list_chirps)),
                    )
                    .route("/chirps/{chirp_id}", web::get().to(get_chirp))
                    .route("/polka/webhooks", web::post().to(polka_webhook)),
            )

            // Operational endpoints
            .service(
                web::scope("/admin")
                    .route("/metrics", web::get().to(metrics))
                    .route("/reset", web::post().to(reset)),
            )

            // Static file serving, behind the hit counter
            .service(
                web::scope("/app")
                    .wrap(MetricsMiddleware::new(app_metrics.clone().into_inner()))
                    .service(fs::Files::new("/", "./public").index_file("index.html")),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}

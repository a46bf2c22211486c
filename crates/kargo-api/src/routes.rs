//! Route configuration

use crate::handlers::{agency, auth, delivery, group, health, search, stats, whatsapp};
use crate::middleware::AuthMiddleware;
use actix_web::web;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Liveness probe, outside the API prefix for load balancers.
        .route("/health", web::get().to(health::health))
        .service(
            web::scope("/api/v1")
                .service(auth_routes())
                // The bridge posts inbound events here; it runs next to the
                // gateway and does not carry user tokens.
                .route("/whatsapp/events", web::post().to(whatsapp::ingest_event))
                .route("/health", web::get().to(health::health))
                .service(protected_routes()),
        );
}

fn auth_routes() -> actix_web::Scope {
    web::scope("/auth")
        .route("/login", web::post().to(auth::login))
        .route("/join", web::post().to(auth::join))
        .service(
            web::resource("/logout")
                .wrap(AuthMiddleware)
                .route(web::post().to(auth::logout)),
        )
        .service(
            web::resource("/me")
                .wrap(AuthMiddleware)
                .route(web::get().to(auth::me)),
        )
}

fn protected_routes(
) -> actix_web::Scope<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    web::scope("")
        .wrap(AuthMiddleware)
        .service(
            web::scope("/agencies")
                .route("", web::get().to(agency::list))
                .route("", web::post().to(agency::create))
                .route("/{id}", web::put().to(agency::update))
                .route("/{id}", web::delete().to(agency::delete)),
        )
        .service(
            web::scope("/groups")
                .route("", web::get().to(group::list))
                .route("/{id}", web::put().to(group::update))
                .route("/{id}", web::delete().to(group::delete)),
        )
        .service(
            web::scope("/deliveries")
                .route("", web::get().to(delivery::list))
                .route("", web::post().to(delivery::create))
                .route("/bulk", web::post().to(delivery::bulk_create))
                .route("/{id}", web::get().to(delivery::get))
                .route("/{id}", web::put().to(delivery::update))
                .route("/{id}", web::delete().to(delivery::delete))
                .route("/{id}/history", web::get().to(delivery::history)),
        )
        .service(web::scope("/stats").route("/daily", web::get().to(stats::daily)))
        .route("/search", web::get().to(search::search))
}

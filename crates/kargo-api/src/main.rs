use actix_web::{middleware::DefaultHeaders, web, App, HttpServer};
use tracing::{error, info};

mod config;
mod error;
mod handlers;
mod logging;
mod middleware;
mod routes;
mod services;
mod state;
mod workers;

use config::AppConfig;
use error::ApiError;
use kargo_core::errors::ErrorKind;
use kargo_db::DbConfig;
use kargo_whatsapp::SessionLock;
use services::reporter::Reporter;
use state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    logging::init_logging();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    let db_config = match DbConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load database configuration: {}", e);
            std::process::exit(1);
        }
    };

    // One gateway per WhatsApp session directory.
    let _session_lock =
        match SessionLock::acquire(&config.session.base_dir, &config.session.client_id) {
            Ok(lock) => lock,
            Err(e) => {
                eprintln!("Failed to acquire session lock: {}", e);
                std::process::exit(1);
            }
        };

    let app_state = match AppState::new(config.clone(), db_config).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application state: {}", e);
            std::process::exit(1);
        }
    };

    // Daily summary broadcast, when configured and a bridge is reachable.
    if config.report.enabled {
        match &app_state.bridge {
            Some(bridge) => {
                Reporter::new(
                    app_state.adapter.clone(),
                    bridge.clone(),
                    config.time_zone,
                    config.report.time,
                )
                .spawn();
            }
            None => info!("reports enabled but no bridge configured, skipping scheduler"),
        }
    }

    let address = config.server.address();
    info!(
        "Kargo API v{} listening on http://{}",
        env!("CARGO_PKG_VERSION"),
        address
    );

    let server_state = app_state.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(server_state.clone()))
            // Malformed JSON keeps the standard error envelope.
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                ApiError::new(ErrorKind::InvalidArgument, err.to_string()).into()
            }))
            .wrap(middleware::RequestId)
            .wrap(middleware::setup_cors(&server_state.config.cors))
            .wrap(DefaultHeaders::new().add(("X-Content-Type-Options", "nosniff")))
            .configure(routes::configure_routes)
    })
    .bind(&address)?;

    let server = server.run();
    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    shutdown_signal().await;
    info!("shutting down");

    server_handle.stop(true).await;
    match server_task.await {
        Ok(Ok(())) => info!("server stopped"),
        Ok(Err(e)) => error!("server error during shutdown: {}", e),
        Err(e) => error!("failed to join server task: {}", e),
    }

    // Stop accepting events, let the lanes drain, then drain the pool.
    app_state.dispatcher.close().await;
    if let Err(e) = app_state.adapter.close().await {
        error!("failed to close database pool: {}", e);
    }

    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}

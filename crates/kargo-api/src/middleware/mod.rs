//! HTTP middleware

pub mod auth;
pub mod request_id;

pub use auth::{AuthMiddleware, AuthUser, Scoped};
pub use request_id::RequestId;

use crate::config::CorsConfig;
use actix_cors::Cors;

/// Build the CORS policy from `ALLOWED_ORIGINS`. An empty list or `*`
/// means any origin.
pub fn setup_cors(config: &CorsConfig) -> Cors {
    let mut cors = Cors::default()
        .allow_any_method()
        .allow_any_header()
        .max_age(3600);

    if config.allowed_origins.is_empty() || config.allowed_origins.iter().any(|o| o == "*") {
        cors = cors.allow_any_origin();
    } else {
        for origin in &config.allowed_origins {
            cors = cors.allowed_origin(origin);
        }
    }
    cors
}

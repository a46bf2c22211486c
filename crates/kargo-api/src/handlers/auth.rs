//! Authentication handlers

use crate::error::{ApiError, ApiResult};
use crate::handlers::ok;
use crate::middleware::AuthUser;
use crate::services::auth as auth_service;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use kargo_core::errors::ErrorKind;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "invalid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub code: String,
}

/// POST /api/v1/auth/login
pub async fn login(
    state: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    payload
        .validate()
        .map_err(kargo_core::errors::CoreError::from)?;

    let (token, agency) = auth_service::login(&state, &payload.email, &payload.password).await?;
    Ok(ok(json!({
        "token": token,
        "user": {
            "id": agency.id,
            "email": agency.email,
            "name": agency.name,
            "role": agency.role,
            "agency_id": agency.id,
        },
    })))
}

/// POST /api/v1/auth/logout
pub async fn logout(state: web::Data<AppState>, user: AuthUser) -> ApiResult<HttpResponse> {
    auth_service::logout(&state, &user.0);
    Ok(ok(json!({ "message": "logged out" })))
}

/// GET /api/v1/auth/me
pub async fn me(user: AuthUser) -> ApiResult<HttpResponse> {
    let claims = user.0;
    Ok(ok(json!({
        "agency_id": claims.sub,
        "email": claims.email,
        "role": claims.role,
        "expires_at": claims.exp,
    })))
}

/// POST /api/v1/auth/join — anonymous agency lookup by join code.
pub async fn join(
    state: web::Data<AppState>,
    payload: web::Json<JoinRequest>,
) -> ApiResult<HttpResponse> {
    match auth_service::join_by_code(&state, &payload.code).await? {
        Some(agency) => Ok(ok(agency)),
        None => Err(ApiError::new(ErrorKind::NotFound, "unknown agency code")),
    }
}

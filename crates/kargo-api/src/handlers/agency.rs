//! Agency management handlers (super-admin surface)

use crate::error::{ApiError, ApiResult};
use crate::handlers::ok;
use crate::middleware::Scoped;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use kargo_core::auth::{hash_password, TenantScope};
use kargo_core::entities::agency::AgencyRole;
use kargo_core::errors::ErrorKind;
use kargo_db::repositories::{AgencyChanges, AgencyRepository, NewAgency};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

fn require_super_admin(scope: TenantScope) -> ApiResult<()> {
    if scope.is_super_admin() {
        Ok(())
    } else {
        Err(ApiError::new(
            ErrorKind::Forbidden,
            "administrator privileges required",
        ))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAgencyRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email(message = "invalid email"))]
    pub email: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
    pub code: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAgencyRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
    pub code: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

/// GET /api/v1/agencies — every agency, inactive included.
pub async fn list(state: web::Data<AppState>, scope: Scoped) -> ApiResult<HttpResponse> {
    require_super_admin(scope.0)?;
    let agencies = AgencyRepository::new(&state.adapter).list_all().await?;
    Ok(ok(agencies))
}

/// POST /api/v1/agencies
pub async fn create(
    state: web::Data<AppState>,
    scope: Scoped,
    payload: web::Json<CreateAgencyRequest>,
) -> ApiResult<HttpResponse> {
    require_super_admin(scope.0)?;
    let payload = payload.into_inner();
    payload
        .validate()
        .map_err(kargo_core::errors::CoreError::from)?;

    let agency = AgencyRepository::new(&state.adapter)
        .create(NewAgency {
            name: payload.name,
            email: payload.email,
            password_hash: hash_password(&payload.password)?,
            role: AgencyRole::Agency,
            code: payload.code,
            address: payload.address,
            phone: payload.phone,
        })
        .await?;
    Ok(ok(agency))
}

/// PUT /api/v1/agencies/:id — partial update; `is_active = false` is the
/// soft delete.
pub async fn update(
    state: web::Data<AppState>,
    scope: Scoped,
    path: web::Path<i64>,
    payload: web::Json<UpdateAgencyRequest>,
) -> ApiResult<HttpResponse> {
    require_super_admin(scope.0)?;
    let payload = payload.into_inner();

    let password_hash = match payload.password.as_deref() {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };

    let agency = AgencyRepository::new(&state.adapter)
        .update(
            path.into_inner(),
            AgencyChanges {
                name: payload.name,
                email: payload.email,
                password_hash,
                is_active: payload.is_active,
                code: payload.code,
                address: payload.address,
                phone: payload.phone,
                logo: None,
            },
        )
        .await?;
    Ok(ok(agency))
}

/// DELETE /api/v1/agencies/:id — soft delete only.
pub async fn delete(
    state: web::Data<AppState>,
    scope: Scoped,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    require_super_admin(scope.0)?;
    AgencyRepository::new(&state.adapter)
        .soft_delete(path.into_inner())
        .await?;
    Ok(ok(json!({ "message": "agency deactivated" })))
}

//! Group management handlers

use crate::error::ApiResult;
use crate::handlers::ok;
use crate::middleware::Scoped;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use kargo_db::repositories::GroupRepository;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteGroupQuery {
    #[serde(default)]
    pub hard: bool,
}

/// GET /api/v1/groups
pub async fn list(state: web::Data<AppState>, scope: Scoped) -> ApiResult<HttpResponse> {
    let groups = GroupRepository::new(&state.adapter).list(scope.0).await?;
    Ok(ok(groups))
}

/// PUT /api/v1/groups/:id — rename or toggle active.
pub async fn update(
    state: web::Data<AppState>,
    scope: Scoped,
    path: web::Path<i64>,
    payload: web::Json<UpdateGroupRequest>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    let group = GroupRepository::new(&state.adapter)
        .update(scope.0, path.into_inner(), payload.name, payload.is_active)
        .await?;
    Ok(ok(group))
}

/// DELETE /api/v1/groups/:id — soft delete by default; `?hard=true`
/// physically removes the group and detaches its deliveries.
pub async fn delete(
    state: web::Data<AppState>,
    scope: Scoped,
    path: web::Path<i64>,
    query: web::Query<DeleteGroupQuery>,
) -> ApiResult<HttpResponse> {
    let repo = GroupRepository::new(&state.adapter);
    let id = path.into_inner();
    if query.hard {
        repo.hard_delete(scope.0, id).await?;
        Ok(ok(json!({ "message": "group deleted" })))
    } else {
        repo.soft_delete(scope.0, id).await?;
        Ok(ok(json!({ "message": "group deactivated" })))
    }
}

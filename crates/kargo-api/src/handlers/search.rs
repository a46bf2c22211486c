//! Search handler

use crate::error::ApiResult;
use crate::handlers::ok;
use crate::middleware::Scoped;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use kargo_db::repositories::DeliveryRepository;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// GET /api/v1/search?q=… — substring match over phone, items, customer
/// name and quartier; capped at 100 rows.
pub async fn search(
    state: web::Data<AppState>,
    scope: Scoped,
    query: web::Query<SearchQuery>,
) -> ApiResult<HttpResponse> {
    let needle = query.q.trim();
    if needle.is_empty() {
        return Ok(ok(Vec::<kargo_core::entities::Delivery>::new()));
    }

    let rows = DeliveryRepository::new(&state.adapter)
        .search(scope.0, needle)
        .await?;
    Ok(ok(rows))
}

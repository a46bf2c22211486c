//! Statistics handlers

use crate::error::ApiResult;
use crate::handlers::ok;
use crate::middleware::Scoped;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use kargo_db::repositories::StatsRepository;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct DailyStatsQuery {
    pub date: Option<NaiveDate>,
    pub group_id: Option<i64>,
    pub agency_id: Option<i64>,
}

/// GET /api/v1/stats/daily — no date means today in the configured zone.
pub async fn daily(
    state: web::Data<AppState>,
    scope: Scoped,
    query: web::Query<DailyStatsQuery>,
) -> ApiResult<HttpResponse> {
    let query = query.into_inner();
    // Agency callers are pinned to their own tenant; administrators may
    // filter freely.
    let agency_id = scope.0.agency_filter().or(query.agency_id);

    let stats = StatsRepository::new(&state.adapter)
        .daily(query.date, agency_id, query.group_id)
        .await?;
    Ok(ok(stats))
}

//! Delivery handlers

use crate::error::{ApiError, ApiResult};
use crate::handlers::{ok, ok_paginated};
use crate::middleware::{AuthUser, Scoped};
use crate::services::resolver;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use kargo_core::entities::common::PaginationParams;
use kargo_core::entities::delivery::DeliveryStatus;
use kargo_core::entities::history::HistoryAction;
use kargo_core::errors::{CoreError, ErrorKind};
use kargo_core::money::Money;
use kargo_core::parser::phone as phone_grammar;
use kargo_core::transitions::Mutation;
use kargo_db::repositories::{BulkRowError, DeliveryDraft, DeliveryFilter, DeliveryRepository, Sort};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub phone: Option<String>,
    pub date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub group_id: Option<i64>,
    pub agency_id: Option<i64>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDeliveryRequest {
    #[validate(length(min = 9, max = 20))]
    pub phone: String,
    #[validate(length(min = 1))]
    pub items: String,
    pub amount_due: f64,
    pub amount_paid: Option<f64>,
    pub delivery_fee: Option<f64>,
    pub customer_name: Option<String>,
    pub quartier: Option<String>,
    pub notes: Option<String>,
    pub carrier: Option<String>,
    pub group_id: Option<i64>,
    pub agency_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct BulkCreateRequest {
    pub deliveries: Vec<CreateDeliveryRequest>,
}

/// Unknown fields here are validation errors, not silently dropped input.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateDeliveryRequest {
    pub status: Option<String>,
    pub delivery_fee: Option<f64>,
    pub amount_paid: Option<f64>,
    pub amount_due: Option<f64>,
    pub items: Option<String>,
    pub phone: Option<String>,
}

/// GET /api/v1/deliveries
pub async fn list(
    state: web::Data<AppState>,
    scope: Scoped,
    query: web::Query<ListQuery>,
) -> ApiResult<HttpResponse> {
    let query = query.into_inner();
    let status = match query.status.as_deref() {
        Some(raw) => Some(DeliveryStatus::parse(raw).ok_or_else(|| {
            ApiError::new(ErrorKind::InvalidArgument, format!("unknown status {:?}", raw))
        })?),
        None => None,
    };

    let filter = DeliveryFilter {
        status,
        phone: query.phone,
        date: query.date,
        start_date: query.start_date,
        end_date: query.end_date,
        group_id: query.group_id,
        agency_id: query.agency_id,
    };
    let page = PaginationParams::new(query.page, query.limit);
    let sort = Sort::parse(query.sort_by.as_deref(), query.sort_dir.as_deref());

    let result = DeliveryRepository::new(&state.adapter)
        .list(scope.0, &filter, page, sort)
        .await?;
    Ok(ok_paginated(&result.rows, result.pagination))
}

/// GET /api/v1/deliveries/:id
pub async fn get(
    state: web::Data<AppState>,
    scope: Scoped,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let delivery = DeliveryRepository::new(&state.adapter)
        .find_scoped(scope.0, id)
        .await?
        .ok_or_else(|| ApiError::new(ErrorKind::NotFound, format!("delivery {} not found", id)))?;
    Ok(ok(delivery))
}

/// POST /api/v1/deliveries — direct create, bypassing ingestion.
pub async fn create(
    state: web::Data<AppState>,
    scope: Scoped,
    user: AuthUser,
    payload: web::Json<CreateDeliveryRequest>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    payload.validate().map_err(CoreError::from)?;

    let draft = draft_from_request(payload, scope.0.agency_filter())
        .map_err(|message| ApiError::new(ErrorKind::InvalidArgument, message))?;
    let delivery = DeliveryRepository::new(&state.adapter)
        .insert(draft, &user.0.email)
        .await?;
    Ok(ok(delivery))
}

/// POST /api/v1/deliveries/bulk — 1 to 100 rows, row-level outcomes.
pub async fn bulk_create(
    state: web::Data<AppState>,
    scope: Scoped,
    user: AuthUser,
    payload: web::Json<BulkCreateRequest>,
) -> ApiResult<HttpResponse> {
    let rows = payload.into_inner().deliveries;
    if rows.is_empty() || rows.len() > 100 {
        return Err(ApiError::new(
            ErrorKind::InvalidArgument,
            format!("bulk insert accepts between 1 and 100 rows, got {}", rows.len()),
        ));
    }

    // Conversion failures surface per row, not as a whole-batch error.
    let agency_filter = scope.0.agency_filter();
    let mut drafts = Vec::with_capacity(rows.len());
    let mut original_index = Vec::with_capacity(rows.len());
    let mut failed: Vec<BulkRowError> = Vec::new();
    for (row_index, row) in rows.into_iter().enumerate() {
        match draft_from_request(row, agency_filter) {
            Ok(draft) => {
                original_index.push(row_index);
                drafts.push(draft);
            }
            Err(error) => failed.push(BulkRowError { row_index, error }),
        }
    }

    let mut created = Vec::new();
    if !drafts.is_empty() {
        let outcome = DeliveryRepository::new(&state.adapter)
            .bulk_insert(drafts, &user.0.email)
            .await?;
        created = outcome.created;
        failed.extend(outcome.failed.into_iter().map(|failure| BulkRowError {
            row_index: original_index[failure.row_index],
            error: failure.error,
        }));
    }
    failed.sort_by_key(|failure| failure.row_index);

    Ok(ok(json!({
        "created": created.len(),
        "failed": failed.len(),
        "results": {
            "created": created,
            "failed": failed,
        },
    })))
}

/// PUT /api/v1/deliveries/:id — applies the status-transition algebra.
pub async fn update(
    state: web::Data<AppState>,
    scope: Scoped,
    user: AuthUser,
    path: web::Path<i64>,
    payload: web::Json<UpdateDeliveryRequest>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let payload = payload.into_inner();

    let target = DeliveryRepository::new(&state.adapter)
        .find_scoped(scope.0, id)
        .await?
        .ok_or_else(|| ApiError::new(ErrorKind::NotFound, format!("delivery {} not found", id)))?;

    let (mutation, action) = plan_api_mutation(&payload)?;
    let details = json!({
        "source": "api",
        "request": {
            "status": payload.status,
            "delivery_fee": payload.delivery_fee,
            "amount_paid": payload.amount_paid,
            "amount_due": payload.amount_due,
            "items": payload.items,
            "phone": payload.phone,
        },
    })
    .to_string();

    let updated = resolver::apply_mutation(
        &state.adapter,
        &state.fee_policy,
        &target,
        &mutation,
        action,
        &details,
        &user.0.email,
    )
    .await?;
    Ok(ok(updated))
}

/// DELETE /api/v1/deliveries/:id — privileged; history cascades first.
pub async fn delete(
    state: web::Data<AppState>,
    scope: Scoped,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    if !scope.0.is_super_admin() {
        return Err(ApiError::new(
            ErrorKind::Forbidden,
            "administrator privileges required",
        ));
    }
    DeliveryRepository::new(&state.adapter)
        .delete(path.into_inner())
        .await?;
    Ok(ok(json!({ "message": "delivery deleted" })))
}

/// GET /api/v1/deliveries/:id/history — newest first.
pub async fn history(
    state: web::Data<AppState>,
    scope: Scoped,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let repo = DeliveryRepository::new(&state.adapter);
    repo.find_scoped(scope.0, id)
        .await?
        .ok_or_else(|| ApiError::new(ErrorKind::NotFound, format!("delivery {} not found", id)))?;
    let entries = repo.history(id).await?;
    Ok(ok(entries))
}

fn draft_from_request(
    payload: CreateDeliveryRequest,
    agency_filter: Option<i64>,
) -> Result<DeliveryDraft, String> {
    let build = || -> Result<DeliveryDraft, CoreError> {
        let mut draft = DeliveryDraft::new(
            payload.phone.clone(),
            payload.items.clone(),
            Money::try_from_f64(payload.amount_due)?,
        );
        if let Some(paid) = payload.amount_paid {
            draft.amount_paid = Money::try_from_f64(paid)?;
        }
        if let Some(fee) = payload.delivery_fee {
            draft.delivery_fee = Money::try_from_f64(fee)?;
        }
        draft.customer_name = payload.customer_name.clone();
        draft.quartier = payload.quartier.clone();
        draft.notes = payload.notes.clone();
        draft.carrier = payload.carrier.clone();
        draft.group_id = payload.group_id;
        // Agency users write into their own tenant; administrators may
        // place rows explicitly.
        draft.agency_id = agency_filter.or(payload.agency_id);
        Ok(draft)
    };
    build().map_err(|e| e.to_string())
}

fn plan_api_mutation(payload: &UpdateDeliveryRequest) -> ApiResult<(Mutation, HistoryAction)> {
    if let Some(raw) = payload.status.as_deref() {
        let next = DeliveryStatus::parse(raw).ok_or_else(|| {
            ApiError::new(ErrorKind::InvalidArgument, format!("unknown status {:?}", raw))
        })?;
        let manual_fee = payload
            .delivery_fee
            .map(Money::try_from_f64)
            .transpose()
            .map_err(ApiError::from)?;
        let amount_paid = payload
            .amount_paid
            .map(Money::try_from_f64)
            .transpose()
            .map_err(ApiError::from)?;
        return Ok((
            Mutation::Status {
                next,
                manual_fee,
                amount_paid,
            },
            HistoryAction::StatusChanged,
        ));
    }

    if payload.amount_due.is_some() || payload.items.is_some() {
        let amount_due = payload
            .amount_due
            .map(Money::try_from_f64)
            .transpose()
            .map_err(ApiError::from)?;
        return Ok((
            Mutation::Modify {
                amount_due,
                items: payload.items.clone(),
            },
            HistoryAction::Updated,
        ));
    }

    if let Some(raw) = payload.phone.as_deref() {
        let to = phone_grammar::normalize(raw).ok_or_else(|| {
            ApiError::new(ErrorKind::InvalidArgument, format!("invalid phone {:?}", raw))
        })?;
        return Ok((Mutation::ChangePhone { to }, HistoryAction::PhoneChanged));
    }

    Err(ApiError::new(
        ErrorKind::InvalidArgument,
        "no update fields provided",
    ))
}

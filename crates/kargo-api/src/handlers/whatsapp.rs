//! Transport intake
//!
//! The bridge posts raw inbound events here. Events are acknowledged as
//! soon as they are queued on their group's lane; processing outcomes
//! never surface on this endpoint.

use crate::error::ApiResult;
use crate::handlers::ok;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use kargo_whatsapp::InboundEvent;
use serde_json::json;
use tracing::debug;

/// POST /api/v1/whatsapp/events
pub async fn ingest_event(
    state: web::Data<AppState>,
    payload: web::Json<InboundEvent>,
) -> ApiResult<HttpResponse> {
    let event = payload.into_inner();
    debug!(
        external_message_id = %event.external_message_id,
        group = event.group_key(),
        "inbound event received"
    );

    state.dispatcher.dispatch(event).await;
    Ok(ok(json!({ "queued": true })))
}

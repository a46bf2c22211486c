//! Update resolver
//!
//! Locates the target delivery (quoted message first, then phone) and
//! applies the typed mutation through the transition algebra. Payment
//! collection is additive and therefore deduplicated by the inbound
//! message id before it is applied.

use kargo_core::entities::delivery::{Delivery, DeliveryStatus};
use kargo_core::entities::history::HistoryAction;
use kargo_core::errors::CoreResult;
use kargo_core::parser::{UpdateCommand, UpdateMessage};
use kargo_core::transitions::{derive, FeePolicy, Mutation};
use kargo_db::repositories::{DeliveryRepository, HistoryRepository, TariffRepository};
use kargo_db::StorageAdapter;
use kargo_whatsapp::InboundEvent;
use serde_json::json;
use tracing::{debug, info};

/// What became of one update message
#[derive(Debug)]
pub enum ResolveOutcome {
    Applied(Delivery),
    /// This inbound message already paid; state unchanged.
    DuplicatePayment(Delivery),
    /// No quoted anchor and no phone in the body.
    TargetUnresolved,
    /// A phone was given but no open delivery matches it.
    TargetMissing,
}

/// Resolve and apply one update from the WhatsApp pipeline.
pub async fn apply_update(
    adapter: &StorageAdapter,
    policy: &FeePolicy,
    agency_id: i64,
    message: &UpdateMessage,
    event: &InboundEvent,
    actor: &str,
) -> CoreResult<ResolveOutcome> {
    let deliveries = DeliveryRepository::new(adapter);

    // Quoted reply first: the stored message id is the primary anchor.
    let mut target = None;
    if let Some(quoted) = event.quoted_external_message_id.as_deref() {
        target = deliveries
            .find_by_message_id(quoted, Some(agency_id))
            .await?;
    }

    let target = match target {
        Some(target) => target,
        None => {
            let phone = match message.phone.as_deref() {
                Some(phone) => phone,
                None => return Ok(ResolveOutcome::TargetUnresolved),
            };
            match deliveries
                .find_by_phone(phone, true, Some(agency_id))
                .await?
            {
                Some(target) => target,
                None => return Ok(ResolveOutcome::TargetMissing),
            }
        }
    };

    // Additive mutation: drop redeliveries of the same inbound message.
    if let UpdateCommand::Collect { .. } = &message.command {
        let history = HistoryRepository::new(adapter);
        if history
            .payment_event_exists(target.id, &event.external_message_id)
            .await?
        {
            debug!(
                delivery_id = target.id,
                external_message_id = %event.external_message_id,
                "duplicate payment message ignored"
            );
            return Ok(ResolveOutcome::DuplicatePayment(target));
        }
    }

    let (mutation, action) = plan(&message.command);
    let details = details_for(&message.command, &target, &event.external_message_id);
    let updated = apply_mutation(adapter, policy, &target, &mutation, action, &details, actor).await?;
    info!(
        delivery_id = updated.id,
        status = updated.status.as_str(),
        "update applied"
    );
    Ok(ResolveOutcome::Applied(updated))
}

/// Derive the target state for `mutation` and persist it together with its
/// history entry. Shared by the WhatsApp path and `PUT /deliveries/:id`.
pub async fn apply_mutation(
    adapter: &StorageAdapter,
    policy: &FeePolicy,
    target: &Delivery,
    mutation: &Mutation,
    action: HistoryAction,
    details: &str,
    actor: &str,
) -> CoreResult<Delivery> {
    let tariff = TariffRepository::new(adapter)
        .amount_for(target.agency_id, target.quartier.as_deref())
        .await?;
    let patch = derive(target, mutation, tariff, policy);
    DeliveryRepository::new(adapter)
        .apply_patch(target, &patch, action, details, actor)
        .await
}

fn plan(command: &UpdateCommand) -> (Mutation, HistoryAction) {
    match command {
        UpdateCommand::MarkDelivered { amount } => (
            Mutation::Status {
                next: DeliveryStatus::Delivered,
                manual_fee: None,
                amount_paid: *amount,
            },
            HistoryAction::StatusChanged,
        ),
        UpdateCommand::Collect { amount } => (
            Mutation::Collect { amount: *amount },
            HistoryAction::PaymentReceived,
        ),
        UpdateCommand::MarkFailed => (
            Mutation::Status {
                next: DeliveryStatus::Failed,
                manual_fee: None,
                amount_paid: None,
            },
            HistoryAction::StatusChanged,
        ),
        UpdateCommand::MarkPickup => (
            Mutation::Status {
                next: DeliveryStatus::Pickup,
                manual_fee: None,
                amount_paid: None,
            },
            HistoryAction::StatusChanged,
        ),
        UpdateCommand::MarkPending => (
            Mutation::Status {
                next: DeliveryStatus::Pending,
                manual_fee: None,
                amount_paid: None,
            },
            HistoryAction::StatusChanged,
        ),
        UpdateCommand::Modify { amount_due, items } => (
            Mutation::Modify {
                amount_due: *amount_due,
                items: items.clone(),
            },
            HistoryAction::Updated,
        ),
        UpdateCommand::ChangePhone { to, .. } => (
            Mutation::ChangePhone { to: to.clone() },
            HistoryAction::PhoneChanged,
        ),
    }
}

fn details_for(command: &UpdateCommand, target: &Delivery, external_message_id: &str) -> String {
    let payload = match command {
        UpdateCommand::MarkDelivered { amount } => json!({
            "command": "delivered",
            "amount": amount,
        }),
        UpdateCommand::Collect { amount } => json!({
            "command": "collected",
            "amount": amount,
        }),
        UpdateCommand::MarkFailed => json!({ "command": "failed" }),
        UpdateCommand::MarkPickup => json!({ "command": "pickup" }),
        UpdateCommand::MarkPending => json!({ "command": "pending" }),
        UpdateCommand::Modify { amount_due, items } => json!({
            "command": "modify",
            "amount_due": amount_due,
            "items": items,
        }),
        UpdateCommand::ChangePhone { from, to } => json!({
            "command": "change_phone",
            "from": from,
            "to": to,
        }),
    };

    let mut payload = payload;
    payload["delivery_id"] = json!(target.id);
    payload["external_message_id"] = json!(external_message_id);
    payload.to_string()
}

//! Delivery history entities
//!
//! History rows are append-only: every successful delivery mutation writes
//! exactly one entry, and nothing on the public surface updates them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a history entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Created,
    Updated,
    StatusChanged,
    PaymentReceived,
    PhoneChanged,
    Deleted,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Created => "created",
            HistoryAction::Updated => "updated",
            HistoryAction::StatusChanged => "status_changed",
            HistoryAction::PaymentReceived => "payment_received",
            HistoryAction::PhoneChanged => "phone_changed",
            HistoryAction::Deleted => "deleted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created" => Some(HistoryAction::Created),
            "updated" => Some(HistoryAction::Updated),
            "status_changed" => Some(HistoryAction::StatusChanged),
            "payment_received" => Some(HistoryAction::PaymentReceived),
            "phone_changed" => Some(HistoryAction::PhoneChanged),
            "deleted" => Some(HistoryAction::Deleted),
            _ => None,
        }
    }
}

/// One audit entry for a delivery mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub delivery_id: i64,
    pub action: HistoryAction,
    /// JSON snapshot of the change, kept as text.
    pub details: String,
    /// `bot` for ingestion, otherwise the authenticated user's email.
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub const BOT_ACTOR: &'static str = "bot";
}

//! Delivery domain entities

use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Delivery lifecycle status.
///
/// `Cancelled` is only reachable through the HTTP surface; the message
/// grammars never produce it. It still counts as a closed status for the
/// open-delivery lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Pickup,
    Delivered,
    Failed,
    ClientAbsent,
    PresentNeDecrocheZone1,
    PresentNeDecrocheZone2,
    Cancelled,
}

impl DeliveryStatus {
    /// Every status, in display order. Used by the stats aggregation.
    pub const ALL: [DeliveryStatus; 8] = [
        DeliveryStatus::Pending,
        DeliveryStatus::Pickup,
        DeliveryStatus::Delivered,
        DeliveryStatus::Failed,
        DeliveryStatus::ClientAbsent,
        DeliveryStatus::PresentNeDecrocheZone1,
        DeliveryStatus::PresentNeDecrocheZone2,
        DeliveryStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Pickup => "pickup",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::ClientAbsent => "client_absent",
            DeliveryStatus::PresentNeDecrocheZone1 => "present_ne_decroche_zone1",
            DeliveryStatus::PresentNeDecrocheZone2 => "present_ne_decroche_zone2",
            DeliveryStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(DeliveryStatus::Pending),
            "pickup" => Some(DeliveryStatus::Pickup),
            "delivered" => Some(DeliveryStatus::Delivered),
            "failed" => Some(DeliveryStatus::Failed),
            "client_absent" => Some(DeliveryStatus::ClientAbsent),
            "present_ne_decroche_zone1" => Some(DeliveryStatus::PresentNeDecrocheZone1),
            "present_ne_decroche_zone2" => Some(DeliveryStatus::PresentNeDecrocheZone2),
            "cancelled" => Some(DeliveryStatus::Cancelled),
            _ => None,
        }
    }

    /// A closed delivery no longer matches the phone-based update lookups.
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            DeliveryStatus::Delivered | DeliveryStatus::Failed | DeliveryStatus::Cancelled
        )
    }

    pub fn is_open(&self) -> bool {
        !self.is_closed()
    }
}

impl Default for DeliveryStatus {
    fn default() -> Self {
        DeliveryStatus::Pending
    }
}

/// The main domain record: one shipment or collection job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: i64,
    /// Local digit form: nine digits starting with 6.
    pub phone: String,
    pub customer_name: Option<String>,
    pub items: String,
    pub amount_due: Money,
    pub amount_paid: Money,
    pub delivery_fee: Money,
    pub status: DeliveryStatus,
    pub quartier: Option<String>,
    pub notes: Option<String>,
    pub carrier: Option<String>,
    pub agency_id: Option<i64>,
    pub group_id: Option<i64>,
    /// Identifier of the originating inbound message. Set when and only
    /// when the record was created from a WhatsApp event; it anchors
    /// quoted-reply updates.
    pub whatsapp_message_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Delivery {
    /// Outstanding balance, floored at zero.
    pub fn remaining(&self) -> Money {
        self.amount_due.sub_floor_zero(self.amount_paid)
    }
}

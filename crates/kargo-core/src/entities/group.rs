//! Group domain entity
//!
//! A group is a WhatsApp channel bound to exactly one agency. Groups are
//! auto-provisioned on the first inbound message from an unknown channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A WhatsApp channel owned by one agency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub agency_id: i64,
    /// Globally-unique channel identifier assigned by the transport.
    pub external_id: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    pub fn is_active(&self) -> bool {
        self.is_active
    }
}

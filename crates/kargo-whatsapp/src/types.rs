//! Transport event types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One raw inbound event as the bridge delivers it. The gateway consumes
/// exactly these fields; everything else the transport knows stays on the
/// bridge side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub body: String,
    pub external_message_id: String,
    pub external_group_id: Option<String>,
    pub group_display_name: Option<String>,
    pub is_group: bool,
    pub from_self: bool,
    pub quoted_external_message_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl InboundEvent {
    /// Key used to serialise processing per channel. Direct messages fall
    /// into a shared lane; they are rejected by the router anyway.
    pub fn group_key(&self) -> &str {
        self.external_group_id.as_deref().unwrap_or("")
    }
}

/// One outbound message handed to the bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// External identifier of the destination channel.
    pub to: String,
    pub body: String,
}

impl OutboundMessage {
    pub fn new(to: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            body: body.into(),
        }
    }
}

//! # kargo-whatsapp
//!
//! The transport boundary of the Kargo gateway. The WhatsApp session itself
//! lives in an external bridge process; this crate defines the inbound
//! event shape that bridge posts to the gateway, a small client for pushing
//! outbound messages back through it, and the filesystem lock that keeps
//! one process per session directory.

pub mod client;
pub mod session;
pub mod types;

pub use client::{BridgeClient, BridgeConfig, BridgeError};
pub use session::SessionLock;
pub use types::{InboundEvent, OutboundMessage};

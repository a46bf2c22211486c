//! Core business logic for the Kargo delivery-operations gateway.
//!
//! This crate is pure: it holds the domain entities, the WhatsApp message
//! grammars, the status-transition algebra and the authentication
//! primitives, and performs no I/O of its own.

pub mod auth;
pub mod entities;
pub mod errors;
pub mod money;
pub mod parser;
pub mod transitions;

pub use errors::{CoreError, CoreResult};
pub use money::Money;

//! Storage layer for the Kargo gateway.
//!
//! One adapter, two backends: an embedded SQLite file and a networked
//! Postgres server. Callers write canonical SQL (`?` placeholders, SQLite
//! date functions); the adapter owns every dialect difference. The typed
//! repositories on top form the Domain Store and never see backend
//! specifics.

pub mod adapter;
pub mod config;
pub mod error;
pub mod repositories;
pub mod schema;

pub use adapter::{ExecOutcome, Param, StorageAdapter};
pub use config::{BackendKind, DbConfig};
pub use error::map_db_err;

//! Schema bootstrap
//!
//! Idempotent DDL for the five tables and their indices, in each backend's
//! dialect, plus the first-run seed of a super-administrator account.

use crate::adapter::{Param, StorageAdapter};
use crate::config::BackendKind;
use kargo_core::auth::hash_password;
use kargo_core::entities::agency::AgencyRole;
use kargo_core::errors::CoreResult;
use sea_orm::DbBackend;
use tracing::info;

/// Create every table and index that does not exist yet.
pub async fn create_schema(adapter: &StorageAdapter) -> CoreResult<()> {
    let backend = match adapter.backend() {
        DbBackend::Postgres => BackendKind::Postgres,
        _ => BackendKind::Sqlite,
    };

    for statement in table_statements(backend) {
        adapter.execute(&statement, vec![]).await?;
    }
    for statement in INDEX_STATEMENTS {
        adapter.execute(statement, vec![]).await?;
    }
    Ok(())
}

fn table_statements(backend: BackendKind) -> Vec<String> {
    // The two dialects differ in id generation, timestamp and binary types.
    let (id, ts, blob, money) = match backend {
        BackendKind::Sqlite => (
            "INTEGER PRIMARY KEY AUTOINCREMENT",
            "TEXT",
            "BLOB",
            "REAL",
        ),
        BackendKind::Postgres => (
            "BIGSERIAL PRIMARY KEY",
            "TIMESTAMPTZ",
            "BYTEA",
            "DOUBLE PRECISION",
        ),
    };

    vec![
        format!(
                "CREATE TABLE IF NOT EXISTS agencies (
                    id {id},
                    name TEXT NOT NULL,
                    email TEXT NOT NULL UNIQUE,
                    password_hash TEXT NOT NULL,
                    role TEXT NOT NULL DEFAULT 'agency',
                    is_active BOOLEAN NOT NULL DEFAULT TRUE,
                    code TEXT UNIQUE,
                    address TEXT,
                    phone TEXT,
                    logo {blob},
                    created_at {ts} NOT NULL,
                    updated_at {ts} NOT NULL
                )"
        ),
        format!(
                "CREATE TABLE IF NOT EXISTS groups (
                    id {id},
                    agency_id BIGINT NOT NULL REFERENCES agencies(id),
                    external_id TEXT NOT NULL UNIQUE,
                    name TEXT NOT NULL,
                    is_active BOOLEAN NOT NULL DEFAULT TRUE,
                    created_at {ts} NOT NULL,
                    updated_at {ts} NOT NULL
                )"
        ),
        format!(
                "CREATE TABLE IF NOT EXISTS deliveries (
                    id {id},
                    phone TEXT NOT NULL,
                    customer_name TEXT,
                    items TEXT NOT NULL,
                    amount_due {money} NOT NULL DEFAULT 0,
                    amount_paid {money} NOT NULL DEFAULT 0,
                    delivery_fee {money},
                    status TEXT NOT NULL DEFAULT 'pending',
                    quartier TEXT,
                    notes TEXT,
                    carrier TEXT,
                    agency_id BIGINT REFERENCES agencies(id),
                    group_id BIGINT REFERENCES groups(id),
                    whatsapp_message_id TEXT,
                    created_at {ts} NOT NULL,
                    updated_at {ts} NOT NULL
                )"
        ),
        format!(
                "CREATE TABLE IF NOT EXISTS delivery_history (
                    id {id},
                    delivery_id BIGINT NOT NULL REFERENCES deliveries(id),
                    action TEXT NOT NULL,
                    details TEXT NOT NULL DEFAULT '{{}}',
                    actor TEXT NOT NULL DEFAULT 'bot',
                    created_at {ts} NOT NULL
                )"
        ),
        format!(
                "CREATE TABLE IF NOT EXISTS tariffs (
                    id {id},
                    agency_id BIGINT NOT NULL REFERENCES agencies(id),
                    quartier TEXT NOT NULL,
                    amount {money} NOT NULL,
                    UNIQUE (agency_id, quartier)
                )"
        ),
    ]
}

const INDEX_STATEMENTS: [&str; 8] = [
    "CREATE INDEX IF NOT EXISTS idx_deliveries_phone ON deliveries (phone)",
    "CREATE INDEX IF NOT EXISTS idx_deliveries_status ON deliveries (status)",
    "CREATE INDEX IF NOT EXISTS idx_deliveries_created_at ON deliveries (created_at)",
    "CREATE INDEX IF NOT EXISTS idx_deliveries_agency_id ON deliveries (agency_id)",
    "CREATE INDEX IF NOT EXISTS idx_deliveries_group_id ON deliveries (group_id)",
    "CREATE INDEX IF NOT EXISTS idx_deliveries_wa_message_id ON deliveries (whatsapp_message_id)",
    "CREATE INDEX IF NOT EXISTS idx_history_delivery_id ON delivery_history (delivery_id)",
    "CREATE INDEX IF NOT EXISTS idx_groups_external_id ON groups (external_id)",
];

/// First-run seed: when the agencies table is empty and the administrator
/// credentials are configured, create an active super-admin account.
pub async fn ensure_seed(
    adapter: &StorageAdapter,
    admin_email: Option<&str>,
    admin_password: Option<&str>,
) -> CoreResult<()> {
    let (email, password) = match (admin_email, admin_password) {
        (Some(email), Some(password)) => (email, password),
        _ => return Ok(()),
    };

    let row = adapter
        .query_one("SELECT COUNT(*) AS n FROM agencies LIMIT 1", vec![])
        .await?;
    let count: i64 = match row {
        Some(row) => row.try_get("", "n").map_err(crate::error::map_db_err)?,
        None => 0,
    };
    if count > 0 {
        return Ok(());
    }

    let now = chrono::Utc::now();
    adapter
        .execute(
            "INSERT INTO agencies (name, email, password_hash, role, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            vec![
                Param::from("Administrator"),
                Param::from(email),
                Param::from(hash_password(password)?),
                Param::from(AgencyRole::SuperAdmin.as_str()),
                Param::from(true),
                Param::from(now),
                Param::from(now),
            ],
        )
        .await?;
    info!(%email, "seeded super-admin account");
    Ok(())
}

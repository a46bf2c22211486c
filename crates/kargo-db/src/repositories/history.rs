//! Delivery history repository
//!
//! Append-only. The payment-deduplication lookup searches the details JSON
//! for the inbound message id, which the resolver always records for
//! `payment_received` entries.

use crate::adapter::{AdapterTxn, Param, Row, StorageAdapter};
use crate::error::map_db_err;
use chrono::Utc;
use kargo_core::entities::history::{HistoryAction, HistoryEntry};
use kargo_core::errors::{CoreError, CoreResult};

const COLUMNS: &str = "id, delivery_id, action, details, actor, created_at";

/// Append one entry inside an open transaction.
pub async fn append_in_txn(
    txn: &AdapterTxn,
    delivery_id: i64,
    action: HistoryAction,
    details: &str,
    actor: &str,
) -> CoreResult<()> {
    txn.execute(
        "INSERT INTO delivery_history (delivery_id, action, details, actor, created_at)
         VALUES (?, ?, ?, ?, ?)",
        vec![
            Param::from(delivery_id),
            Param::from(action.as_str()),
            Param::from(details),
            Param::from(actor),
            Param::from(Utc::now()),
        ],
    )
    .await?;
    Ok(())
}

pub struct HistoryRepository<'a> {
    adapter: &'a StorageAdapter,
}

impl<'a> HistoryRepository<'a> {
    pub fn new(adapter: &'a StorageAdapter) -> Self {
        Self { adapter }
    }

    pub async fn append(
        &self,
        delivery_id: i64,
        action: HistoryAction,
        details: &str,
        actor: &str,
    ) -> CoreResult<()> {
        self.adapter
            .execute(
                "INSERT INTO delivery_history (delivery_id, action, details, actor, created_at)
                 VALUES (?, ?, ?, ?, ?)",
                vec![
                    Param::from(delivery_id),
                    Param::from(action.as_str()),
                    Param::from(details),
                    Param::from(actor),
                    Param::from(Utc::now()),
                ],
            )
            .await?;
        Ok(())
    }

    /// Newest first.
    pub async fn list_for_delivery(&self, delivery_id: i64) -> CoreResult<Vec<HistoryEntry>> {
        let rows = self
            .adapter
            .query_all(
                &format!(
                    "SELECT {} FROM delivery_history WHERE delivery_id = ? ORDER BY created_at DESC, id DESC",
                    COLUMNS
                ),
                vec![Param::from(delivery_id)],
            )
            .await?;
        rows.iter().map(from_row).collect()
    }

    /// Whether a payment for this inbound message was already recorded.
    pub async fn payment_event_exists(
        &self,
        delivery_id: i64,
        external_message_id: &str,
    ) -> CoreResult<bool> {
        let pattern = format!(r#"%"external_message_id":"{}"%"#, external_message_id);
        let row = self
            .adapter
            .query_one(
                "SELECT COUNT(*) AS n FROM delivery_history
                 WHERE delivery_id = ? AND action = ? AND details LIKE ? LIMIT 1",
                vec![
                    Param::from(delivery_id),
                    Param::from(HistoryAction::PaymentReceived.as_str()),
                    Param::from(pattern),
                ],
            )
            .await?;
        let count: i64 = match row {
            Some(row) => row.try_get("", "n").map_err(map_db_err)?,
            None => 0,
        };
        Ok(count > 0)
    }
}

pub(crate) fn from_row(row: &Row) -> CoreResult<HistoryEntry> {
    let action_raw: String = row.try_get("", "action").map_err(map_db_err)?;
    let action = HistoryAction::parse(&action_raw)
        .ok_or_else(|| CoreError::internal(format!("unknown history action {:?}", action_raw)))?;

    Ok(HistoryEntry {
        id: row.try_get("", "id").map_err(map_db_err)?,
        delivery_id: row.try_get("", "delivery_id").map_err(map_db_err)?,
        action,
        details: row.try_get("", "details").map_err(map_db_err)?,
        actor: row.try_get("", "actor").map_err(map_db_err)?,
        created_at: row.try_get("", "created_at").map_err(map_db_err)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DbConfig;
    use crate::schema::create_schema;

    async fn adapter() -> StorageAdapter {
        let mut config = DbConfig::sqlite("ignored");
        config.url = "sqlite::memory:".to_string();
        config.max_connections = 1;
        let adapter = StorageAdapter::connect(&config).await.unwrap();
        create_schema(&adapter).await.unwrap();
        adapter
    }

    #[tokio::test]
    async fn test_append_and_list_newest_first() {
        let adapter = adapter().await;
        let repo = HistoryRepository::new(&adapter);

        repo.append(1, HistoryAction::Created, "{}", "bot").await.unwrap();
        repo.append(1, HistoryAction::StatusChanged, "{}", "bot").await.unwrap();

        let entries = repo.list_for_delivery(1).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, HistoryAction::StatusChanged);
        assert_eq!(entries[1].action, HistoryAction::Created);
    }

    #[tokio::test]
    async fn test_payment_dedup_lookup() {
        let adapter = adapter().await;
        let repo = HistoryRepository::new(&adapter);

        let details = r#"{"amount":7000,"external_message_id":"wamid.77"}"#;
        repo.append(1, HistoryAction::PaymentReceived, details, "bot").await.unwrap();

        assert!(repo.payment_event_exists(1, "wamid.77").await.unwrap());
        assert!(!repo.payment_event_exists(1, "wamid.78").await.unwrap());
        assert!(!repo.payment_event_exists(2, "wamid.77").await.unwrap());
    }
}

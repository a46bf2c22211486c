//! Daily statistics

use crate::adapter::{Param, StorageAdapter};
use crate::error::map_db_err;
use chrono::{NaiveDate, Utc};
use kargo_core::entities::delivery::DeliveryStatus;
use kargo_core::errors::CoreResult;
use kargo_core::money::Money;
use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregated numbers for one server-local calendar day
#[derive(Debug, Clone, Serialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
    /// Σ amount_paid
    pub collected: Money,
    /// Σ (amount_due − amount_paid)
    pub remaining: Money,
    /// Σ amount_due
    pub due: Money,
}

pub struct StatsRepository<'a> {
    adapter: &'a StorageAdapter,
}

impl<'a> StatsRepository<'a> {
    pub fn new(adapter: &'a StorageAdapter) -> Self {
        Self { adapter }
    }

    /// Counts and monetary totals for `date`, or for today in the
    /// configured zone when no date is given.
    pub async fn daily(
        &self,
        date: Option<NaiveDate>,
        agency_id: Option<i64>,
        group_id: Option<i64>,
    ) -> CoreResult<DailyStats> {
        let date = date.unwrap_or_else(|| {
            Utc::now()
                .with_timezone(&self.adapter.time_zone())
                .date_naive()
        });

        let mut sql = String::from(
            "SELECT status, COUNT(*) AS n,
                    COALESCE(SUM(amount_paid), 0) AS paid,
                    COALESCE(SUM(amount_due), 0) AS due
             FROM deliveries
             WHERE DATE(created_at, 'localtime') = ?",
        );
        let mut params = vec![Param::from(date)];
        if let Some(agency_id) = agency_id {
            sql.push_str(" AND agency_id = ?");
            params.push(Param::from(agency_id));
        }
        if let Some(group_id) = group_id {
            sql.push_str(" AND group_id = ?");
            params.push(Param::from(group_id));
        }
        sql.push_str(" GROUP BY status");

        let rows = self.adapter.query_all(&sql, params).await?;

        let mut by_status: BTreeMap<String, i64> = DeliveryStatus::ALL
            .iter()
            .map(|status| (status.as_str().to_string(), 0))
            .collect();
        let mut total = 0i64;
        let mut collected = Money::ZERO;
        let mut due = Money::ZERO;

        for row in rows {
            let status: String = row.try_get("", "status").map_err(map_db_err)?;
            let count: i64 = row.try_get("", "n").map_err(map_db_err)?;
            let paid_sum: f64 = row.try_get("", "paid").map_err(map_db_err)?;
            let due_sum: f64 = row.try_get("", "due").map_err(map_db_err)?;

            total += count;
            collected = collected + Money::try_from_f64(paid_sum)?;
            due = due + Money::try_from_f64(due_sum)?;
            by_status.insert(status, count);
        }

        Ok(DailyStats {
            date,
            total,
            by_status,
            collected,
            remaining: due.sub_floor_zero(collected),
            due,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DbConfig;
    use crate::schema::create_schema;
    use chrono::DateTime;

    async fn adapter() -> StorageAdapter {
        let mut config = DbConfig::sqlite("ignored");
        config.url = "sqlite::memory:".to_string();
        config.max_connections = 1;
        let adapter = StorageAdapter::connect(&config).await.unwrap();
        create_schema(&adapter).await.unwrap();
        adapter
    }

    async fn seed_delivery(
        adapter: &StorageAdapter,
        status: &str,
        due: f64,
        paid: f64,
        created_at: &str,
    ) {
        let created_at: DateTime<Utc> = created_at.parse().unwrap();
        adapter
            .execute(
                "INSERT INTO deliveries (phone, items, amount_due, amount_paid, status, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                vec![
                    Param::from("612345678"),
                    Param::from("2 robes"),
                    Param::Money(due),
                    Param::Money(paid),
                    Param::from(status),
                    Param::from(created_at),
                    Param::from(created_at),
                ],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_daily_totals() {
        let adapter = adapter().await;
        // Noon UTC keeps the sample on the same local calendar day in the
        // default zone (UTC+1).
        seed_delivery(&adapter, "delivered", 15_000.0, 14_000.0, "2024-05-01T12:00:00Z").await;
        seed_delivery(&adapter, "pending", 10_000.0, 2_000.0, "2024-05-01T12:30:00Z").await;
        seed_delivery(&adapter, "pending", 9_000.0, 0.0, "2024-04-30T12:00:00Z").await;

        let stats = StatsRepository::new(&adapter)
            .daily(Some("2024-05-01".parse().unwrap()), None, None)
            .await
            .unwrap();

        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_status["delivered"], 1);
        assert_eq!(stats.by_status["pending"], 1);
        assert_eq!(stats.by_status["failed"], 0);
        assert_eq!(stats.collected, Money::from_major(16_000));
        assert_eq!(stats.due, Money::from_major(25_000));
        assert_eq!(stats.remaining, Money::from_major(9_000));
    }

    #[tokio::test]
    async fn test_empty_day() {
        let adapter = adapter().await;
        let stats = StatsRepository::new(&adapter)
            .daily(Some("2024-05-01".parse().unwrap()), None, None)
            .await
            .unwrap();

        assert_eq!(stats.total, 0);
        assert_eq!(stats.collected, Money::ZERO);
        assert_eq!(stats.remaining, Money::ZERO);
    }
}

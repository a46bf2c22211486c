//! Delivery repository

use super::history::append_in_txn;
use super::{DeliveryFilter, Sort};
use crate::adapter::{Param, Row, StorageAdapter};
use crate::error::map_db_err;
use chrono::Utc;
use kargo_core::auth::TenantScope;
use kargo_core::entities::common::{Paginated, Pagination, PaginationParams};
use kargo_core::entities::delivery::{Delivery, DeliveryStatus};
use kargo_core::entities::history::{HistoryAction, HistoryEntry};
use kargo_core::errors::{CoreError, CoreResult};
use kargo_core::money::Money;
use kargo_core::parser::phone as phone_grammar;
use kargo_core::transitions::DeliveryPatch;
use serde_json::json;

const COLUMNS: &str = "id, phone, customer_name, items, amount_due, amount_paid, delivery_fee, status, quartier, notes, carrier, agency_id, group_id, whatsapp_message_id, created_at, updated_at";

/// Fields for a new delivery row
#[derive(Debug, Clone)]
pub struct DeliveryDraft {
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
    pub whatsapp_message_id: Option<String>,
}

impl DeliveryDraft {
    /// A minimal draft; the ingestion pipeline and the HTTP handlers fill
    /// in ownership and provenance.
    pub fn new(phone: impl Into<String>, items: impl Into<String>, amount_due: Money) -> Self {
        Self {
            phone: phone.into(),
            customer_name: None,
            items: items.into(),
            amount_due,
            amount_paid: Money::ZERO,
            delivery_fee: Money::ZERO,
            status: DeliveryStatus::Pending,
            quartier: None,
            notes: None,
            carrier: None,
            agency_id: None,
            group_id: None,
            whatsapp_message_id: None,
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        match phone_grammar::normalize(&self.phone) {
            Some(normalized) if normalized == self.phone => {}
            Some(_) => {
                return Err(CoreError::invalid_argument(
                    "phone must be in local digit form (nine digits starting with 6)",
                ))
            }
            None => {
                return Err(CoreError::invalid_argument(format!(
                    "invalid phone {:?}",
                    self.phone
                )))
            }
        }
        if self.items.trim().is_empty() {
            return Err(CoreError::invalid_argument("items must not be empty"));
        }
        Ok(())
    }

    fn created_details(&self) -> String {
        json!({
            "phone": self.phone,
            "items": self.items,
            "amount_due": self.amount_due,
            "quartier": self.quartier,
            "carrier": self.carrier,
        })
        .to_string()
    }
}

/// Per-row failure inside a bulk insert
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BulkRowError {
    pub row_index: usize,
    pub error: String,
}

/// Outcome of a bulk insert: both halves of the partial-success contract
#[derive(Debug)]
pub struct BulkOutcome {
    pub created: Vec<Delivery>,
    pub failed: Vec<BulkRowError>,
}

pub struct DeliveryRepository<'a> {
    adapter: &'a StorageAdapter,
}

impl<'a> DeliveryRepository<'a> {
    pub fn new(adapter: &'a StorageAdapter) -> Self {
        Self { adapter }
    }

    /// Insert one delivery; the `created` history row is part of the same
    /// transaction.
    pub async fn insert(&self, draft: DeliveryDraft, actor: &str) -> CoreResult<Delivery> {
        draft.validate()?;
        let txn = self.adapter.begin().await?;
        let delivery = insert_in_txn(&txn, &draft, actor).await?;
        txn.commit().await?;
        Ok(delivery)
    }

    /// Insert up to 100 rows in one transaction, one savepoint per row.
    /// Rows that fail validation or insertion are reported back with their
    /// index; the rest persist.
    pub async fn bulk_insert(
        &self,
        drafts: Vec<DeliveryDraft>,
        actor: &str,
    ) -> CoreResult<BulkOutcome> {
        if drafts.is_empty() || drafts.len() > 100 {
            return Err(CoreError::invalid_argument(format!(
                "bulk insert accepts between 1 and 100 rows, got {}",
                drafts.len()
            )));
        }

        let txn = self.adapter.begin().await?;
        let mut created = Vec::new();
        let mut failed = Vec::new();

        for (row_index, draft) in drafts.into_iter().enumerate() {
            if let Err(error) = draft.validate() {
                failed.push(BulkRowError {
                    row_index,
                    error: error.to_string(),
                });
                continue;
            }

            let savepoint = txn.savepoint().await?;
            match insert_in_txn(&savepoint, &draft, actor).await {
                Ok(delivery) => {
                    savepoint.commit().await?;
                    created.push(delivery);
                }
                Err(error) => {
                    savepoint.rollback().await?;
                    failed.push(BulkRowError {
                        row_index,
                        error: error.to_string(),
                    });
                }
            }
        }

        txn.commit().await?;
        Ok(BulkOutcome { created, failed })
    }

    /// Scoped single-row fetch; a mismatching tenant sees nothing.
    pub async fn find_scoped(&self, scope: TenantScope, id: i64) -> CoreResult<Option<Delivery>> {
        let row = self
            .adapter
            .query_one(
                &format!("SELECT {} FROM deliveries WHERE id = ? LIMIT 1", COLUMNS),
                vec![Param::from(id)],
            )
            .await?;
        match row {
            Some(row) => {
                let delivery = from_row(&row)?;
                if scope.can_access(delivery.agency_id) || scope.is_super_admin() {
                    Ok(Some(delivery))
                } else {
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }

    /// Most recent delivery for a phone. `open_only` excludes the closed
    /// statuses.
    pub async fn find_by_phone(
        &self,
        phone: &str,
        open_only: bool,
        agency_id: Option<i64>,
    ) -> CoreResult<Option<Delivery>> {
        let mut sql = format!("SELECT {} FROM deliveries WHERE phone = ?", COLUMNS);
        let mut params = vec![Param::from(phone)];

        if open_only {
            sql.push_str(" AND status NOT IN (?, ?, ?)");
            params.push(Param::from(DeliveryStatus::Delivered.as_str()));
            params.push(Param::from(DeliveryStatus::Failed.as_str()));
            params.push(Param::from(DeliveryStatus::Cancelled.as_str()));
        }
        if let Some(agency_id) = agency_id {
            sql.push_str(" AND agency_id = ?");
            params.push(Param::from(agency_id));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC LIMIT 1");

        let row = self.adapter.query_one(&sql, params).await?;
        row.map(|row| from_row(&row)).transpose()
    }

    /// Most recent delivery anchored to an inbound message id; the primary
    /// key for reply-threaded updates.
    pub async fn find_by_message_id(
        &self,
        external_message_id: &str,
        agency_id: Option<i64>,
    ) -> CoreResult<Option<Delivery>> {
        let mut sql = format!(
            "SELECT {} FROM deliveries WHERE whatsapp_message_id = ?",
            COLUMNS
        );
        let mut params = vec![Param::from(external_message_id)];
        if let Some(agency_id) = agency_id {
            sql.push_str(" AND agency_id = ?");
            params.push(Param::from(agency_id));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC LIMIT 1");

        let row = self.adapter.query_one(&sql, params).await?;
        row.map(|row| from_row(&row)).transpose()
    }

    /// Filtered, sorted, paginated list.
    pub async fn list(
        &self,
        scope: TenantScope,
        filter: &DeliveryFilter,
        page: PaginationParams,
        sort: Sort,
    ) -> CoreResult<Paginated<Delivery>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<Param> = Vec::new();

        if let Some(agency_id) = scope.agency_filter() {
            clauses.push("agency_id = ?".to_string());
            params.push(Param::from(agency_id));
        } else if let Some(agency_id) = filter.agency_id {
            clauses.push("agency_id = ?".to_string());
            params.push(Param::from(agency_id));
        }
        if let Some(status) = filter.status {
            clauses.push("status = ?".to_string());
            params.push(Param::from(status.as_str()));
        }
        if let Some(phone) = &filter.phone {
            clauses.push("phone LIKE ?".to_string());
            params.push(Param::from(format!("%{}%", phone)));
        }
        if let Some(date) = filter.date {
            clauses.push("DATE(created_at, 'localtime') = ?".to_string());
            params.push(Param::from(date));
        }
        if let Some(start) = filter.start_date {
            clauses.push("DATE(created_at, 'localtime') >= ?".to_string());
            params.push(Param::from(start));
        }
        if let Some(end) = filter.end_date {
            clauses.push("DATE(created_at, 'localtime') <= ?".to_string());
            params.push(Param::from(end));
        }
        if let Some(group_id) = filter.group_id {
            clauses.push("group_id = ?".to_string());
            params.push(Param::from(group_id));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let count_row = self
            .adapter
            .query_one(
                &format!("SELECT COUNT(*) AS n FROM deliveries{} LIMIT 1", where_sql),
                params.clone(),
            )
            .await?;
        let total: i64 = match count_row {
            Some(row) => row.try_get("", "n").map_err(map_db_err)?,
            None => 0,
        };

        let mut list_params = params;
        list_params.push(Param::from(page.limit as i64));
        list_params.push(Param::from(page.offset() as i64));
        let rows = self
            .adapter
            .query_all(
                &format!(
                    "SELECT {} FROM deliveries{} ORDER BY {} LIMIT ? OFFSET ?",
                    COLUMNS,
                    where_sql,
                    sort.order_by()
                ),
                list_params,
            )
            .await?;

        Ok(Paginated {
            rows: rows.iter().map(from_row).collect::<CoreResult<Vec<_>>>()?,
            pagination: Pagination::new(page, total as u64),
        })
    }

    /// Case-insensitive substring search over phone, items, customer name
    /// and quartier. Hard cap of 100 rows.
    pub async fn search(&self, scope: TenantScope, query: &str) -> CoreResult<Vec<Delivery>> {
        let pattern = format!("%{}%", query.to_lowercase());
        let mut sql = format!(
            "SELECT {} FROM deliveries
             WHERE (LOWER(phone) LIKE ? OR LOWER(items) LIKE ?
                    OR LOWER(COALESCE(customer_name, '')) LIKE ?
                    OR LOWER(COALESCE(quartier, '')) LIKE ?)",
            COLUMNS
        );
        let mut params = vec![
            Param::from(pattern.clone()),
            Param::from(pattern.clone()),
            Param::from(pattern.clone()),
            Param::from(pattern),
        ];
        if let Some(agency_id) = scope.agency_filter() {
            sql.push_str(" AND agency_id = ?");
            params.push(Param::from(agency_id));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC LIMIT 100");

        let rows = self.adapter.query_all(&sql, params).await?;
        rows.iter().map(from_row).collect()
    }

    /// Apply a derived patch and append its history entry in one
    /// transaction. A failure anywhere leaves the row untouched.
    pub async fn apply_patch(
        &self,
        delivery: &Delivery,
        patch: &DeliveryPatch,
        action: HistoryAction,
        details: &str,
        actor: &str,
    ) -> CoreResult<Delivery> {
        let now = Utc::now();
        let items = patch.items.clone().unwrap_or_else(|| delivery.items.clone());
        let phone = patch.phone.clone().unwrap_or_else(|| delivery.phone.clone());

        let txn = self.adapter.begin().await?;
        let outcome = txn
            .execute(
                "UPDATE deliveries SET status = ?, amount_due = ?, amount_paid = ?, delivery_fee = ?, items = ?, phone = ?, updated_at = ?
                 WHERE id = ?",
                vec![
                    Param::from(patch.status.as_str()),
                    Param::from(patch.amount_due),
                    Param::from(patch.amount_paid),
                    Param::from(patch.delivery_fee),
                    Param::from(items.clone()),
                    Param::from(phone.clone()),
                    Param::from(now),
                    Param::from(delivery.id),
                ],
            )
            .await?;
        if outcome.rows_affected == 0 {
            txn.rollback().await?;
            return Err(CoreError::not_found("Delivery", &delivery.id.to_string()));
        }
        append_in_txn(&txn, delivery.id, action, details, actor).await?;
        txn.commit().await?;

        Ok(Delivery {
            status: patch.status,
            amount_due: patch.amount_due,
            amount_paid: patch.amount_paid,
            delivery_fee: patch.delivery_fee,
            items,
            phone,
            updated_at: now,
            ..delivery.clone()
        })
    }

    /// Privileged hard delete: history rows first, then the delivery, in
    /// one transaction on either backend.
    pub async fn delete(&self, id: i64) -> CoreResult<()> {
        let txn = self.adapter.begin().await?;
        txn.execute(
            "DELETE FROM delivery_history WHERE delivery_id = ?",
            vec![Param::from(id)],
        )
        .await?;
        let outcome = txn
            .execute("DELETE FROM deliveries WHERE id = ?", vec![Param::from(id)])
            .await?;
        if outcome.rows_affected == 0 {
            txn.rollback().await?;
            return Err(CoreError::not_found("Delivery", &id.to_string()));
        }
        txn.commit().await
    }

    /// History for one delivery, newest first (scope checked by callers
    /// via `find_scoped`).
    pub async fn history(&self, delivery_id: i64) -> CoreResult<Vec<HistoryEntry>> {
        super::HistoryRepository::new(self.adapter)
            .list_for_delivery(delivery_id)
            .await
    }
}

async fn insert_in_txn(
    txn: &crate::adapter::AdapterTxn,
    draft: &DeliveryDraft,
    actor: &str,
) -> CoreResult<Delivery> {
    let now = Utc::now();
    let id = txn
        .insert_returning_id(
            "INSERT INTO deliveries (phone, customer_name, items, amount_due, amount_paid, delivery_fee, status, quartier, notes, carrier, agency_id, group_id, whatsapp_message_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            vec![
                Param::from(draft.phone.clone()),
                Param::OptText(draft.customer_name.clone()),
                Param::from(draft.items.clone()),
                Param::from(draft.amount_due),
                Param::from(draft.amount_paid),
                Param::from(draft.delivery_fee),
                Param::from(draft.status.as_str()),
                Param::OptText(draft.quartier.clone()),
                Param::OptText(draft.notes.clone()),
                Param::OptText(draft.carrier.clone()),
                Param::OptInt(draft.agency_id),
                Param::OptInt(draft.group_id),
                Param::OptText(draft.whatsapp_message_id.clone()),
                Param::from(now),
                Param::from(now),
            ],
        )
        .await?;

    append_in_txn(txn, id, HistoryAction::Created, &draft.created_details(), actor).await?;

    Ok(Delivery {
        id,
        phone: draft.phone.clone(),
        customer_name: draft.customer_name.clone(),
        items: draft.items.clone(),
        amount_due: draft.amount_due,
        amount_paid: draft.amount_paid,
        delivery_fee: draft.delivery_fee,
        status: draft.status,
        quartier: draft.quartier.clone(),
        notes: draft.notes.clone(),
        carrier: draft.carrier.clone(),
        agency_id: draft.agency_id,
        group_id: draft.group_id,
        whatsapp_message_id: draft.whatsapp_message_id.clone(),
        created_at: now,
        updated_at: now,
    })
}

pub(crate) fn from_row(row: &Row) -> CoreResult<Delivery> {
    let status_raw: String = row.try_get("", "status").map_err(map_db_err)?;
    let status = DeliveryStatus::parse(&status_raw)
        .ok_or_else(|| CoreError::internal(format!("unknown delivery status {:?}", status_raw)))?;

    let amount_due: f64 = row.try_get("", "amount_due").map_err(map_db_err)?;
    let amount_paid: f64 = row.try_get("", "amount_paid").map_err(map_db_err)?;
    let delivery_fee: Option<f64> = row.try_get("", "delivery_fee").map_err(map_db_err)?;

    Ok(Delivery {
        id: row.try_get("", "id").map_err(map_db_err)?,
        phone: row.try_get("", "phone").map_err(map_db_err)?,
        customer_name: row.try_get("", "customer_name").map_err(map_db_err)?,
        items: row.try_get("", "items").map_err(map_db_err)?,
        amount_due: Money::try_from_f64(amount_due)?,
        amount_paid: Money::try_from_f64(amount_paid)?,
        // The "no fee" case may be stored as NULL by older writers.
        delivery_fee: Money::try_from_f64(delivery_fee.unwrap_or(0.0))?,
        status,
        quartier: row.try_get("", "quartier").map_err(map_db_err)?,
        notes: row.try_get("", "notes").map_err(map_db_err)?,
        carrier: row.try_get("", "carrier").map_err(map_db_err)?,
        agency_id: row.try_get("", "agency_id").map_err(map_db_err)?,
        group_id: row.try_get("", "group_id").map_err(map_db_err)?,
        whatsapp_message_id: row.try_get("", "whatsapp_message_id").map_err(map_db_err)?,
        created_at: row.try_get("", "created_at").map_err(map_db_err)?,
        updated_at: row.try_get("", "updated_at").map_err(map_db_err)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DbConfig;
    use crate::repositories::agency::{AgencyRepository, NewAgency};
    use crate::schema::create_schema;
    use kargo_core::entities::agency::AgencyRole;
    use kargo_core::transitions::{derive, FeePolicy, Mutation};

    async fn adapter_with_agency() -> (StorageAdapter, i64) {
        let mut config = DbConfig::sqlite("ignored");
        config.url = "sqlite::memory:".to_string();
        config.max_connections = 1;
        let adapter = StorageAdapter::connect(&config).await.unwrap();
        create_schema(&adapter).await.unwrap();

        let agency = AgencyRepository::new(&adapter)
            .create(NewAgency {
                name: "Express Douala".to_string(),
                email: "a@b.cm".to_string(),
                password_hash: "hash".to_string(),
                role: AgencyRole::Agency,
                code: None,
                address: None,
                phone: None,
            })
            .await
            .unwrap();
        (adapter, agency.id)
    }

    fn draft(phone: &str, agency_id: i64, message_id: Option<&str>) -> DeliveryDraft {
        let mut draft = DeliveryDraft::new(phone, "2 robes", Money::from_major(15_000));
        draft.agency_id = Some(agency_id);
        draft.group_id = None;
        draft.whatsapp_message_id = message_id.map(str::to_string);
        draft
    }

    #[tokio::test]
    async fn test_insert_writes_created_history() {
        let (adapter, agency_id) = adapter_with_agency().await;
        let repo = DeliveryRepository::new(&adapter);

        let delivery = repo
            .insert(draft("612345678", agency_id, Some("wamid.1")), "bot")
            .await
            .unwrap();
        assert_eq!(delivery.status, DeliveryStatus::Pending);

        let history = repo.history(delivery.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, HistoryAction::Created);
        assert_eq!(history[0].actor, "bot");
    }

    #[tokio::test]
    async fn test_find_by_phone_open_only() {
        let (adapter, agency_id) = adapter_with_agency().await;
        let repo = DeliveryRepository::new(&adapter);
        let delivery = repo
            .insert(draft("612345678", agency_id, None), "bot")
            .await
            .unwrap();

        let found = repo
            .find_by_phone("612345678", true, Some(agency_id))
            .await
            .unwrap();
        assert_eq!(found.map(|d| d.id), Some(delivery.id));

        // Close it; the open-only lookup no longer matches.
        let patch = derive(
            &delivery,
            &Mutation::Status {
                next: DeliveryStatus::Failed,
                manual_fee: None,
                amount_paid: None,
            },
            None,
            &FeePolicy::default(),
        );
        repo.apply_patch(&delivery, &patch, HistoryAction::StatusChanged, "{}", "bot")
            .await
            .unwrap();

        assert!(repo
            .find_by_phone("612345678", true, Some(agency_id))
            .await
            .unwrap()
            .is_none());
        assert!(repo
            .find_by_phone("612345678", false, Some(agency_id))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_find_by_message_id() {
        let (adapter, agency_id) = adapter_with_agency().await;
        let repo = DeliveryRepository::new(&adapter);
        let delivery = repo
            .insert(draft("612345678", agency_id, Some("wamid.9")), "bot")
            .await
            .unwrap();

        let found = repo.find_by_message_id("wamid.9", None).await.unwrap();
        assert_eq!(found.map(|d| d.id), Some(delivery.id));
        assert!(repo.find_by_message_id("wamid.10", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_is_tenant_scoped() {
        let (adapter, agency_id) = adapter_with_agency().await;
        let other = AgencyRepository::new(&adapter)
            .create(NewAgency {
                name: "Autre".to_string(),
                email: "other@b.cm".to_string(),
                password_hash: "hash".to_string(),
                role: AgencyRole::Agency,
                code: None,
                address: None,
                phone: None,
            })
            .await
            .unwrap();

        let repo = DeliveryRepository::new(&adapter);
        repo.insert(draft("612345678", agency_id, None), "bot").await.unwrap();
        repo.insert(draft("655555555", other.id, None), "bot").await.unwrap();

        let all = repo
            .list(
                TenantScope::Unrestricted,
                &DeliveryFilter::default(),
                PaginationParams::default(),
                Sort::default(),
            )
            .await
            .unwrap();
        assert_eq!(all.pagination.total, 2);

        let mine = repo
            .list(
                TenantScope::Agency(agency_id),
                &DeliveryFilter::default(),
                PaginationParams::default(),
                Sort::default(),
            )
            .await
            .unwrap();
        assert_eq!(mine.pagination.total, 1);
        assert_eq!(mine.rows[0].phone, "612345678");
    }

    #[tokio::test]
    async fn test_list_filters_by_status_and_phone() {
        let (adapter, agency_id) = adapter_with_agency().await;
        let repo = DeliveryRepository::new(&adapter);
        repo.insert(draft("612345678", agency_id, None), "bot").await.unwrap();
        repo.insert(draft("655555555", agency_id, None), "bot").await.unwrap();

        let filter = DeliveryFilter {
            phone: Some("6555".to_string()),
            ..Default::default()
        };
        let page = repo
            .list(
                TenantScope::Unrestricted,
                &filter,
                PaginationParams::default(),
                Sort::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.rows[0].phone, "655555555");

        let filter = DeliveryFilter {
            status: Some(DeliveryStatus::Delivered),
            ..Default::default()
        };
        let page = repo
            .list(
                TenantScope::Unrestricted,
                &filter,
                PaginationParams::default(),
                Sort::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 0);
    }

    #[tokio::test]
    async fn test_bulk_insert_partial_success() {
        let (adapter, agency_id) = adapter_with_agency().await;
        let repo = DeliveryRepository::new(&adapter);

        let rows = vec![
            draft("612345678", agency_id, None),
            draft("not-a-phone", agency_id, None),
            draft("655555555", agency_id, None),
        ];
        let outcome = repo.bulk_insert(rows, "api").await.unwrap();

        assert_eq!(outcome.created.len(), 2);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].row_index, 1);

        let all = repo
            .list(
                TenantScope::Unrestricted,
                &DeliveryFilter::default(),
                PaginationParams::default(),
                Sort::default(),
            )
            .await
            .unwrap();
        assert_eq!(all.pagination.total, 2);
    }

    #[tokio::test]
    async fn test_bulk_insert_bounds() {
        let (adapter, agency_id) = adapter_with_agency().await;
        let repo = DeliveryRepository::new(&adapter);

        let err = repo.bulk_insert(vec![], "api").await.unwrap_err();
        assert_eq!(err.kind(), kargo_core::errors::ErrorKind::InvalidArgument);

        let too_many = (0..101).map(|_| draft("612345678", agency_id, None)).collect();
        let err = repo.bulk_insert(too_many, "api").await.unwrap_err();
        assert_eq!(err.kind(), kargo_core::errors::ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_delete_cascades_history() {
        let (adapter, agency_id) = adapter_with_agency().await;
        let repo = DeliveryRepository::new(&adapter);
        let delivery = repo
            .insert(draft("612345678", agency_id, None), "bot")
            .await
            .unwrap();

        repo.delete(delivery.id).await.unwrap();

        assert!(repo
            .find_scoped(TenantScope::Unrestricted, delivery.id)
            .await
            .unwrap()
            .is_none());
        assert!(repo.history(delivery.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_caps_and_matches() {
        let (adapter, agency_id) = adapter_with_agency().await;
        let repo = DeliveryRepository::new(&adapter);
        let mut with_quartier = draft("612345678", agency_id, None);
        with_quartier.quartier = Some("Bonapriso".to_string());
        repo.insert(with_quartier, "bot").await.unwrap();
        repo.insert(draft("655555555", agency_id, None), "bot").await.unwrap();

        let hits = repo.search(TenantScope::Unrestricted, "bonapriso").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].phone, "612345678");

        let hits = repo.search(TenantScope::Agency(agency_id + 1), "robes").await.unwrap();
        assert!(hits.is_empty());
    }
}

//! Tariff repository

use crate::adapter::{Param, Row, StorageAdapter};
use crate::error::map_db_err;
use kargo_core::entities::tariff::Tariff;
use kargo_core::errors::CoreResult;
use kargo_core::money::Money;

const COLUMNS: &str = "id, agency_id, quartier, amount";

pub struct TariffRepository<'a> {
    adapter: &'a StorageAdapter,
}

impl<'a> TariffRepository<'a> {
    pub fn new(adapter: &'a StorageAdapter) -> Self {
        Self { adapter }
    }

    /// Default delivery fee for `(agency, quartier)`. Quartier matching is
    /// case-insensitive; either key missing means no tariff.
    pub async fn amount_for(
        &self,
        agency_id: Option<i64>,
        quartier: Option<&str>,
    ) -> CoreResult<Option<Money>> {
        let (agency_id, quartier) = match (agency_id, quartier) {
            (Some(agency_id), Some(quartier)) => (agency_id, quartier),
            _ => return Ok(None),
        };

        let row = self
            .adapter
            .query_one(
                "SELECT amount FROM tariffs WHERE agency_id = ? AND LOWER(quartier) = LOWER(?) LIMIT 1",
                vec![Param::from(agency_id), Param::from(quartier)],
            )
            .await?;
        match row {
            Some(row) => {
                let amount: f64 = row.try_get("", "amount").map_err(map_db_err)?;
                Ok(Some(Money::try_from_f64(amount)?))
            }
            None => Ok(None),
        }
    }

    /// Insert or replace the tariff for `(agency, quartier)`.
    pub async fn upsert(&self, agency_id: i64, quartier: &str, amount: Money) -> CoreResult<Tariff> {
        let existing = self
            .adapter
            .query_one(
                "SELECT id FROM tariffs WHERE agency_id = ? AND LOWER(quartier) = LOWER(?) LIMIT 1",
                vec![Param::from(agency_id), Param::from(quartier)],
            )
            .await?;

        let id = match existing {
            Some(row) => {
                let id: i64 = row.try_get("", "id").map_err(map_db_err)?;
                self.adapter
                    .execute(
                        "UPDATE tariffs SET amount = ? WHERE id = ?",
                        vec![Param::from(amount), Param::from(id)],
                    )
                    .await?;
                id
            }
            None => {
                self.adapter
                    .insert_returning_id(
                        "INSERT INTO tariffs (agency_id, quartier, amount) VALUES (?, ?, ?)",
                        vec![
                            Param::from(agency_id),
                            Param::from(quartier),
                            Param::from(amount),
                        ],
                    )
                    .await?
            }
        };

        Ok(Tariff {
            id,
            agency_id,
            quartier: quartier.to_string(),
            amount,
        })
    }

    pub async fn list_for_agency(&self, agency_id: i64) -> CoreResult<Vec<Tariff>> {
        let rows = self
            .adapter
            .query_all(
                &format!(
                    "SELECT {} FROM tariffs WHERE agency_id = ? ORDER BY quartier ASC",
                    COLUMNS
                ),
                vec![Param::from(agency_id)],
            )
            .await?;
        rows.iter().map(from_row).collect()
    }
}

fn from_row(row: &Row) -> CoreResult<Tariff> {
    let amount: f64 = row.try_get("", "amount").map_err(map_db_err)?;
    Ok(Tariff {
        id: row.try_get("", "id").map_err(map_db_err)?,
        agency_id: row.try_get("", "agency_id").map_err(map_db_err)?,
        quartier: row.try_get("", "quartier").map_err(map_db_err)?,
        amount: Money::try_from_f64(amount)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DbConfig;
    use crate::repositories::agency::{AgencyRepository, NewAgency};
    use crate::schema::create_schema;
    use kargo_core::entities::agency::AgencyRole;

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

    #[tokio::test]
    async fn test_upsert_and_lookup() {
        let (adapter, agency_id) = adapter_with_agency().await;
        let repo = TariffRepository::new(&adapter);

        repo.upsert(agency_id, "Bonapriso", Money::from_major(1000)).await.unwrap();
        let amount = repo
            .amount_for(Some(agency_id), Some("bonapriso"))
            .await
            .unwrap();
        assert_eq!(amount, Some(Money::from_major(1000)));

        // Upsert replaces, it does not duplicate.
        repo.upsert(agency_id, "BONAPRISO", Money::from_major(1500)).await.unwrap();
        let tariffs = repo.list_for_agency(agency_id).await.unwrap();
        assert_eq!(tariffs.len(), 1);
        assert_eq!(tariffs[0].amount, Money::from_major(1500));
    }

    #[tokio::test]
    async fn test_missing_keys_mean_no_tariff() {
        let (adapter, agency_id) = adapter_with_agency().await;
        let repo = TariffRepository::new(&adapter);

        assert_eq!(repo.amount_for(None, Some("Bonapriso")).await.unwrap(), None);
        assert_eq!(repo.amount_for(Some(agency_id), None).await.unwrap(), None);
        assert_eq!(
            repo.amount_for(Some(agency_id), Some("Akwa")).await.unwrap(),
            None
        );
    }
}

//! Agency repository

use crate::adapter::{Param, Row, StorageAdapter};
use crate::error::map_db_err;
use chrono::Utc;
use kargo_core::entities::agency::{normalize_code, Agency, AgencyRole};
use kargo_core::errors::{CoreError, CoreResult};

/// Fields for a new agency
#[derive(Debug, Clone)]
pub struct NewAgency {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: AgencyRole,
    pub code: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

/// Partial update; only provided fields are written
#[derive(Debug, Clone, Default)]
pub struct AgencyChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub is_active: Option<bool>,
    pub code: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub logo: Option<Vec<u8>>,
}

const COLUMNS: &str = "id, name, email, password_hash, role, is_active, code, address, phone, logo, created_at, updated_at";

pub struct AgencyRepository<'a> {
    adapter: &'a StorageAdapter,
}

impl<'a> AgencyRepository<'a> {
    pub fn new(adapter: &'a StorageAdapter) -> Self {
        Self { adapter }
    }

    pub async fn create(&self, input: NewAgency) -> CoreResult<Agency> {
        let now = Utc::now();
        let code = match &input.code {
            Some(raw) => Some(normalize_code(raw).ok_or_else(|| {
                CoreError::invalid_argument("agency code must be at least 4 characters")
            })?),
            None => None,
        };

        let id = self
            .adapter
            .insert_returning_id(
                "INSERT INTO agencies (name, email, password_hash, role, is_active, code, address, phone, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                vec![
                    Param::from(input.name.clone()),
                    Param::from(input.email.clone()),
                    Param::from(input.password_hash.clone()),
                    Param::from(input.role.as_str()),
                    Param::from(true),
                    Param::OptText(code.clone()),
                    Param::OptText(input.address.clone()),
                    Param::OptText(input.phone.clone()),
                    Param::from(now),
                    Param::from(now),
                ],
            )
            .await?;

        Ok(Agency {
            id,
            name: input.name,
            email: input.email,
            password_hash: input.password_hash,
            role: input.role,
            is_active: true,
            code,
            address: input.address,
            phone: input.phone,
            logo: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn find_by_id(&self, id: i64) -> CoreResult<Option<Agency>> {
        let row = self
            .adapter
            .query_one(
                &format!("SELECT {} FROM agencies WHERE id = ? LIMIT 1", COLUMNS),
                vec![Param::from(id)],
            )
            .await?;
        row.map(|row| from_row(&row)).transpose()
    }

    pub async fn find_by_email(&self, email: &str) -> CoreResult<Option<Agency>> {
        let row = self
            .adapter
            .query_one(
                &format!(
                    "SELECT {} FROM agencies WHERE LOWER(email) = LOWER(?) LIMIT 1",
                    COLUMNS
                ),
                vec![Param::from(email)],
            )
            .await?;
        row.map(|row| from_row(&row)).transpose()
    }

    /// Case-insensitive code lookup. Codes shorter than four characters are
    /// not valid keys and return nothing.
    pub async fn get_by_code(&self, code: &str) -> CoreResult<Option<Agency>> {
        let code = match normalize_code(code) {
            Some(code) => code,
            None => return Ok(None),
        };
        let row = self
            .adapter
            .query_one(
                &format!("SELECT {} FROM agencies WHERE code = ? LIMIT 1", COLUMNS),
                vec![Param::from(code)],
            )
            .await?;
        row.map(|row| from_row(&row)).transpose()
    }

    /// Every agency, active or not. Super-admin surface only.
    pub async fn list_all(&self) -> CoreResult<Vec<Agency>> {
        let rows = self
            .adapter
            .query_all(
                &format!("SELECT {} FROM agencies ORDER BY created_at ASC, id ASC", COLUMNS),
                vec![],
            )
            .await?;
        rows.iter().map(from_row).collect()
    }

    pub async fn update(&self, id: i64, changes: AgencyChanges) -> CoreResult<Agency> {
        let mut sets: Vec<&str> = Vec::new();
        let mut params: Vec<Param> = Vec::new();

        if let Some(name) = changes.name {
            sets.push("name = ?");
            params.push(Param::from(name));
        }
        if let Some(email) = changes.email {
            sets.push("email = ?");
            params.push(Param::from(email));
        }
        if let Some(password_hash) = changes.password_hash {
            sets.push("password_hash = ?");
            params.push(Param::from(password_hash));
        }
        if let Some(is_active) = changes.is_active {
            sets.push("is_active = ?");
            params.push(Param::from(is_active));
        }
        if let Some(code) = changes.code {
            let code = normalize_code(&code).ok_or_else(|| {
                CoreError::invalid_argument("agency code must be at least 4 characters")
            })?;
            sets.push("code = ?");
            params.push(Param::from(code));
        }
        if let Some(address) = changes.address {
            sets.push("address = ?");
            params.push(Param::from(address));
        }
        if let Some(phone) = changes.phone {
            sets.push("phone = ?");
            params.push(Param::from(phone));
        }
        if let Some(logo) = changes.logo {
            sets.push("logo = ?");
            params.push(Param::Bytes(Some(logo)));
        }

        if !sets.is_empty() {
            sets.push("updated_at = ?");
            params.push(Param::from(Utc::now()));
            params.push(Param::from(id));

            let outcome = self
                .adapter
                .execute(
                    &format!("UPDATE agencies SET {} WHERE id = ?", sets.join(", ")),
                    params,
                )
                .await?;
            if outcome.rows_affected == 0 {
                return Err(CoreError::not_found("Agency", &id.to_string()));
            }
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Agency", &id.to_string()))
    }

    /// Soft delete: clear the active flag, keep the row.
    pub async fn soft_delete(&self, id: i64) -> CoreResult<()> {
        let outcome = self
            .adapter
            .execute(
                "UPDATE agencies SET is_active = ?, updated_at = ? WHERE id = ?",
                vec![Param::from(false), Param::from(Utc::now()), Param::from(id)],
            )
            .await?;
        if outcome.rows_affected == 0 {
            return Err(CoreError::not_found("Agency", &id.to_string()));
        }
        Ok(())
    }

    /// Choose the tenant for an auto-provisioned group: the configured
    /// default agency when it is active, else the earliest-created active
    /// non-administrative agency.
    pub async fn pick_provision_tenant(
        &self,
        default_agency_id: Option<i64>,
    ) -> CoreResult<Option<i64>> {
        if let Some(id) = default_agency_id {
            if let Some(agency) = self.find_by_id(id).await? {
                if agency.is_active {
                    return Ok(Some(agency.id));
                }
            }
        }

        let row = self
            .adapter
            .query_one(
                "SELECT id FROM agencies WHERE is_active = ? AND role = ? ORDER BY created_at ASC, id ASC LIMIT 1",
                vec![Param::from(true), Param::from(AgencyRole::Agency.as_str())],
            )
            .await?;
        match row {
            Some(row) => Ok(Some(row.try_get("", "id").map_err(map_db_err)?)),
            None => Ok(None),
        }
    }
}

pub(crate) fn from_row(row: &Row) -> CoreResult<Agency> {
    let role_raw: String = row.try_get("", "role").map_err(map_db_err)?;
    let role = AgencyRole::parse(&role_raw)
        .ok_or_else(|| CoreError::internal(format!("unknown agency role {:?}", role_raw)))?;

    Ok(Agency {
        id: row.try_get("", "id").map_err(map_db_err)?,
        name: row.try_get("", "name").map_err(map_db_err)?,
        email: row.try_get("", "email").map_err(map_db_err)?,
        password_hash: row.try_get("", "password_hash").map_err(map_db_err)?,
        role,
        is_active: row.try_get("", "is_active").map_err(map_db_err)?,
        code: row.try_get("", "code").map_err(map_db_err)?,
        address: row.try_get("", "address").map_err(map_db_err)?,
        phone: row.try_get("", "phone").map_err(map_db_err)?,
        logo: row.try_get("", "logo").map_err(map_db_err)?,
        created_at: row.try_get("", "created_at").map_err(map_db_err)?,
        updated_at: row.try_get("", "updated_at").map_err(map_db_err)?,
    })
}

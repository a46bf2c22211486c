//! Group repository

use crate::adapter::{Param, Row, StorageAdapter};
use crate::error::map_db_err;
use chrono::Utc;
use kargo_core::auth::TenantScope;
use kargo_core::entities::group::Group;
use kargo_core::errors::{CoreError, CoreResult};

const COLUMNS: &str = "id, agency_id, external_id, name, is_active, created_at, updated_at";

pub struct GroupRepository<'a> {
    adapter: &'a StorageAdapter,
}

impl<'a> GroupRepository<'a> {
    pub fn new(adapter: &'a StorageAdapter) -> Self {
        Self { adapter }
    }

    pub async fn find_by_external_id(&self, external_id: &str) -> CoreResult<Option<Group>> {
        let row = self
            .adapter
            .query_one(
                &format!(
                    "SELECT {} FROM groups WHERE external_id = ? LIMIT 1",
                    COLUMNS
                ),
                vec![Param::from(external_id)],
            )
            .await?;
        row.map(|row| from_row(&row)).transpose()
    }

    /// Create the group for an unknown channel. Two racing events for the
    /// same channel resolve through the unique constraint: the loser
    /// re-reads the winner's row.
    pub async fn provision(
        &self,
        agency_id: i64,
        external_id: &str,
        name: &str,
    ) -> CoreResult<Group> {
        let now = Utc::now();
        let inserted = self
            .adapter
            .insert_returning_id(
                "INSERT INTO groups (agency_id, external_id, name, is_active, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                vec![
                    Param::from(agency_id),
                    Param::from(external_id),
                    Param::from(name),
                    Param::from(true),
                    Param::from(now),
                    Param::from(now),
                ],
            )
            .await;

        match inserted {
            Ok(id) => Ok(Group {
                id,
                agency_id,
                external_id: external_id.to_string(),
                name: name.to_string(),
                is_active: true,
                created_at: now,
                updated_at: now,
            }),
            Err(CoreError::Conflict(_)) => self
                .find_by_external_id(external_id)
                .await?
                .ok_or_else(|| CoreError::internal("provisioning race left no group row")),
            Err(other) => Err(other),
        }
    }

    pub async fn list(&self, scope: TenantScope) -> CoreResult<Vec<Group>> {
        let (sql, params) = match scope.agency_filter() {
            Some(agency_id) => (
                format!(
                    "SELECT {} FROM groups WHERE agency_id = ? ORDER BY created_at ASC, id ASC",
                    COLUMNS
                ),
                vec![Param::from(agency_id)],
            ),
            None => (
                format!("SELECT {} FROM groups ORDER BY created_at ASC, id ASC", COLUMNS),
                vec![],
            ),
        };
        let rows = self.adapter.query_all(&sql, params).await?;
        rows.iter().map(from_row).collect()
    }

    /// Scoped single-row fetch; a mismatching tenant sees nothing.
    pub async fn find_scoped(&self, scope: TenantScope, id: i64) -> CoreResult<Option<Group>> {
        let row = self
            .adapter
            .query_one(
                &format!("SELECT {} FROM groups WHERE id = ? LIMIT 1", COLUMNS),
                vec![Param::from(id)],
            )
            .await?;
        match row {
            Some(row) => {
                let group = from_row(&row)?;
                if scope.can_access(Some(group.agency_id)) {
                    Ok(Some(group))
                } else {
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }

    pub async fn update(
        &self,
        scope: TenantScope,
        id: i64,
        name: Option<String>,
        is_active: Option<bool>,
    ) -> CoreResult<Group> {
        let group = self
            .find_scoped(scope, id)
            .await?
            .ok_or_else(|| CoreError::not_found("Group", &id.to_string()))?;

        let mut sets: Vec<&str> = Vec::new();
        let mut params: Vec<Param> = Vec::new();
        if let Some(name) = name {
            sets.push("name = ?");
            params.push(Param::from(name));
        }
        if let Some(is_active) = is_active {
            sets.push("is_active = ?");
            params.push(Param::from(is_active));
        }
        if sets.is_empty() {
            return Ok(group);
        }

        sets.push("updated_at = ?");
        params.push(Param::from(Utc::now()));
        params.push(Param::from(id));
        self.adapter
            .execute(
                &format!("UPDATE groups SET {} WHERE id = ?", sets.join(", ")),
                params,
            )
            .await?;

        self.find_scoped(scope, id)
            .await?
            .ok_or_else(|| CoreError::not_found("Group", &id.to_string()))
    }

    pub async fn soft_delete(&self, scope: TenantScope, id: i64) -> CoreResult<()> {
        self.update(scope, id, None, Some(false)).await?;
        Ok(())
    }

    /// Physically remove the group. Its deliveries are detached, not
    /// cascaded.
    pub async fn hard_delete(&self, scope: TenantScope, id: i64) -> CoreResult<()> {
        self.find_scoped(scope, id)
            .await?
            .ok_or_else(|| CoreError::not_found("Group", &id.to_string()))?;

        let txn = self.adapter.begin().await?;
        txn.execute(
            "UPDATE deliveries SET group_id = NULL WHERE group_id = ?",
            vec![Param::from(id)],
        )
        .await?;
        txn.execute("DELETE FROM groups WHERE id = ?", vec![Param::from(id)])
            .await?;
        txn.commit().await
    }
}

pub(crate) fn from_row(row: &Row) -> CoreResult<Group> {
    Ok(Group {
        id: row.try_get("", "id").map_err(map_db_err)?,
        agency_id: row.try_get("", "agency_id").map_err(map_db_err)?,
        external_id: row.try_get("", "external_id").map_err(map_db_err)?,
        name: row.try_get("", "name").map_err(map_db_err)?,
        is_active: row.try_get("", "is_active").map_err(map_db_err)?,
        created_at: row.try_get("", "created_at").map_err(map_db_err)?,
        updated_at: row.try_get("", "updated_at").map_err(map_db_err)?,
    })
}

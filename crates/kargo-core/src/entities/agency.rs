//! Agency domain entities
//!
//! An agency is the tenant: the unit of data isolation. Agencies are only
//! ever soft-deleted by clearing the active flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Agency roles in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgencyRole {
    SuperAdmin,
    Agency,
}

impl AgencyRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgencyRole::SuperAdmin => "super_admin",
            AgencyRole::Agency => "agency",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "super_admin" => Some(AgencyRole::SuperAdmin),
            "agency" => Some(AgencyRole::Agency),
            _ => None,
        }
    }
}

impl Default for AgencyRole {
    fn default() -> Self {
        AgencyRole::Agency
    }
}

/// Agency entity (a tenant)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agency {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: AgencyRole,
    pub is_active: bool,
    /// Short join code, stored upper-cased and trimmed, unique when present.
    pub code: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub logo: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agency {
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == AgencyRole::SuperAdmin
    }

    /// Public view exposed by the join-by-code flow. Never includes
    /// credentials or contact internals beyond what a joining member needs.
    pub fn public_view(&self) -> PublicAgency {
        PublicAgency {
            id: self.id,
            name: self.name.clone(),
            code: self.code.clone(),
            address: self.address.clone(),
            phone: self.phone.clone(),
        }
    }
}

/// Public agency metadata returned to anonymous join-by-code callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicAgency {
    pub id: i64,
    pub name: String,
    pub code: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

/// Canonical form of an agency code: trimmed and upper-cased. Codes
/// shorter than four characters are not valid lookup keys.
pub fn normalize_code(input: &str) -> Option<String> {
    let code = input.trim().to_uppercase();
    if code.len() < 4 {
        None
    } else {
        Some(code)
    }
}

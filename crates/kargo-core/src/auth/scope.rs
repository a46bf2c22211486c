//! Tenant scope
//!
//! The runtime predicate derived from an authenticated session. Threading
//! the scope value through every store operation makes the isolation
//! property an argument of the call, not a convention.

use super::token::Claims;
use crate::entities::agency::AgencyRole;
use serde::{Deserialize, Serialize};

/// What an authenticated caller may see
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TenantScope {
    /// Super-administrators see every tenant.
    Unrestricted,
    /// Agency users see exactly their own rows.
    Agency(i64),
}

impl TenantScope {
    pub fn from_claims(claims: &Claims) -> Self {
        match claims.role {
            AgencyRole::SuperAdmin => TenantScope::Unrestricted,
            AgencyRole::Agency => TenantScope::Agency(claims.sub),
        }
    }

    /// The `agency_id` every list/stats query must be narrowed to, if any.
    pub fn agency_filter(&self) -> Option<i64> {
        match self {
            TenantScope::Unrestricted => None,
            TenantScope::Agency(id) => Some(*id),
        }
    }

    /// Whether a row with the given owner is visible. Rows without an
    /// owning agency are only visible to super-administrators.
    pub fn can_access(&self, row_agency_id: Option<i64>) -> bool {
        match self {
            TenantScope::Unrestricted => true,
            TenantScope::Agency(id) => row_agency_id == Some(*id),
        }
    }

    pub fn is_super_admin(&self) -> bool {
        matches!(self, TenantScope::Unrestricted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrestricted_sees_everything() {
        let scope = TenantScope::Unrestricted;
        assert_eq!(scope.agency_filter(), None);
        assert!(scope.can_access(Some(7)));
        assert!(scope.can_access(None));
        assert!(scope.is_super_admin());
    }

    #[test]
    fn test_agency_scope_is_narrow() {
        let scope = TenantScope::Agency(7);
        assert_eq!(scope.agency_filter(), Some(7));
        assert!(scope.can_access(Some(7)));
        assert!(!scope.can_access(Some(8)));
        assert!(!scope.can_access(None));
        assert!(!scope.is_super_admin());
    }
}

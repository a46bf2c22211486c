//! Typed repositories — the Domain Store
//!
//! Each repository is a thin struct over the storage adapter. Every read
//! that can cross tenants takes a `TenantScope` and narrows itself; the
//! SQL stays canonical and the adapter handles the dialect.

pub mod agency;
pub mod delivery;
pub mod group;
pub mod history;
pub mod stats;
pub mod tariff;

pub use agency::{AgencyChanges, AgencyRepository, NewAgency};
pub use delivery::{BulkOutcome, BulkRowError, DeliveryDraft, DeliveryRepository};
pub use group::GroupRepository;
pub use history::HistoryRepository;
pub use stats::{DailyStats, StatsRepository};
pub use tariff::TariffRepository;

use chrono::NaiveDate;
use kargo_core::entities::delivery::DeliveryStatus;

/// Filters accepted by the delivery list query
#[derive(Debug, Clone, Default)]
pub struct DeliveryFilter {
    pub status: Option<DeliveryStatus>,
    /// Substring match over the phone column.
    pub phone: Option<String>,
    /// Exact server-local calendar day.
    pub date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub group_id: Option<i64>,
    /// Explicit tenant filter; only honoured for unrestricted scopes.
    pub agency_id: Option<i64>,
}

/// Sort order for the delivery list. Unknown columns and directions fall
/// back to the default silently; they are not validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    column: &'static str,
    descending: bool,
}

impl Sort {
    const COLUMNS: [&'static str; 6] = [
        "created_at",
        "updated_at",
        "amount_due",
        "amount_paid",
        "status",
        "phone",
    ];

    pub fn parse(column: Option<&str>, direction: Option<&str>) -> Self {
        let column = column
            .and_then(|c| Self::COLUMNS.iter().find(|known| **known == c))
            .copied()
            .unwrap_or("created_at");
        let descending = match direction {
            Some("asc") | Some("ASC") => false,
            Some("desc") | Some("DESC") => true,
            _ => true,
        };
        Self { column, descending }
    }

    pub fn order_by(&self) -> String {
        format!(
            "{} {}",
            self.column,
            if self.descending { "DESC" } else { "ASC" }
        )
    }
}

impl Default for Sort {
    fn default() -> Self {
        Self::parse(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_whitelist() {
        assert_eq!(Sort::parse(Some("amount_due"), Some("asc")).order_by(), "amount_due ASC");
        assert_eq!(Sort::parse(Some("phone"), Some("desc")).order_by(), "phone DESC");
    }

    #[test]
    fn test_unknown_sort_falls_back_silently() {
        assert_eq!(
            Sort::parse(Some("password_hash"), Some("asc")).order_by(),
            "created_at ASC"
        );
        assert_eq!(
            Sort::parse(Some("1; DROP TABLE deliveries"), None).order_by(),
            "created_at DESC"
        );
        assert_eq!(Sort::parse(None, Some("sideways")).order_by(), "created_at DESC");
    }
}

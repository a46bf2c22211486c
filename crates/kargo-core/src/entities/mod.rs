//! Domain entities

pub mod agency;
pub mod common;
pub mod delivery;
pub mod group;
pub mod history;
pub mod tariff;

pub use agency::{Agency, AgencyRole, PublicAgency};
pub use common::{Paginated, Pagination, PaginationParams};
pub use delivery::{Delivery, DeliveryStatus};
pub use group::Group;
pub use history::{HistoryAction, HistoryEntry};
pub use tariff::Tariff;

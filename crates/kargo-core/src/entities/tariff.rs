//! Tariff reference data
//!
//! One row per `(agency, quartier)`: the default delivery fee applied when
//! a delivery transitions into a status that demands one.

use crate::money::Money;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tariff {
    pub id: i64,
    pub agency_id: i64,
    pub quartier: String,
    pub amount: Money,
}

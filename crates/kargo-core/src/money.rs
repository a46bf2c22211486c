//! Monetary values as integer minor units.
//!
//! Amounts travel through the process as an `i64` of centimes and are only
//! converted to decimal form at the storage and wire boundaries. Rounding
//! is half-away-from-zero to two decimals; negative amounts are rejected.

use crate::errors::{CoreError, CoreResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Add;

/// A non-negative monetary amount in minor units (centimes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Build from minor units (centimes). Negative input is clamped by the
    /// callers that own validation; this constructor trusts its input.
    pub fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Build from whole currency units, the form the message grammars emit.
    pub fn from_major(major: i64) -> Self {
        Money(major * 100)
    }

    /// Convert a wire/file decimal into money, rounding half-away-from-zero
    /// to two decimals. Negative, NaN and infinite values are rejected.
    pub fn try_from_f64(value: f64) -> CoreResult<Self> {
        if !value.is_finite() {
            return Err(CoreError::invalid_argument(format!(
                "amount must be a finite number, got {}",
                value
            )));
        }
        let minor = round_half_away(value * 100.0);
        if minor < 0 {
            return Err(CoreError::invalid_argument(format!(
                "amount must not be negative, got {}",
                value
            )));
        }
        Ok(Money(minor))
    }

    pub fn as_minor(&self) -> i64 {
        self.0
    }

    /// Decimal form for the storage columns and the JSON wire.
    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Subtraction floored at zero, the only subtraction the transition
    /// algebra needs.
    pub fn sub_floor_zero(&self, other: Money) -> Money {
        Money((self.0 - other.0).max(0))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 100 == 0 {
            write!(f, "{}", self.0 / 100)
        } else {
            write!(f, "{:.2}", self.as_f64())
        }
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Money::try_from_f64(value).map_err(serde::de::Error::custom)
    }
}

/// Round to the nearest integer, ties away from zero.
fn round_half_away(value: f64) -> i64 {
    value.round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_major() {
        assert_eq!(Money::from_major(15_000).as_minor(), 1_500_000);
        assert_eq!(Money::from_major(15_000).as_f64(), 15_000.0);
    }

    #[test]
    fn test_rounding_half_away_from_zero() {
        assert_eq!(Money::try_from_f64(10.005).unwrap().as_minor(), 1001);
        assert_eq!(Money::try_from_f64(10.004).unwrap().as_minor(), 1000);
        assert_eq!(Money::try_from_f64(0.125).unwrap().as_minor(), 13);
    }

    #[test]
    fn test_negative_rejected() {
        assert!(Money::try_from_f64(-0.01).is_err());
        assert!(Money::try_from_f64(f64::NAN).is_err());
        assert!(Money::try_from_f64(f64::INFINITY).is_err());
    }

    #[test]
    fn test_sub_floor_zero() {
        let due = Money::from_major(15_000);
        let fee = Money::from_major(1_000);
        assert_eq!(due.sub_floor_zero(fee), Money::from_major(14_000));
        assert_eq!(fee.sub_floor_zero(due), Money::ZERO);
    }

    #[test]
    fn test_wire_round_trip() {
        let money = Money::try_from_f64(1234.56).unwrap();
        let json = serde_json::to_string(&money).unwrap();
        assert_eq!(json, "1234.56");
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back, money);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_major(15_000).to_string(), "15000");
        assert_eq!(Money::try_from_f64(10.5).unwrap().to_string(), "10.50");
    }
}

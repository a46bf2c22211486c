//! Status-transition algebra
//!
//! Every mutation is derived as a target state from the current row, never
//! applied as a blind delta. That makes redelivery of the same inbound
//! message converge to the same end state; payment collection is the one
//! additive case and is deduplicated upstream by the resolver.

use crate::entities::delivery::{Delivery, DeliveryStatus};
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Fixed fees applied by the special statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePolicy {
    pub pickup_fee: Money,
    pub zone1_fee: Money,
    pub zone2_fee: Money,
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self {
            pickup_fee: Money::from_major(1000),
            zone1_fee: Money::from_major(500),
            zone2_fee: Money::from_major(1000),
        }
    }
}

/// A mutation requested against one delivery
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Move to `next`, optionally forcing the fee and/or the payment.
    Status {
        next: DeliveryStatus,
        manual_fee: Option<Money>,
        amount_paid: Option<Money>,
    },
    /// Add to the collected payment.
    Collect { amount: Money },
    /// Rewrite the content fields.
    Modify {
        amount_due: Option<Money>,
        items: Option<String>,
    },
    /// Move the record to a new phone.
    ChangePhone { to: String },
}

/// The derived target state. `items` and `phone` are `None` when unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryPatch {
    pub status: DeliveryStatus,
    pub amount_due: Money,
    pub amount_paid: Money,
    pub delivery_fee: Money,
    pub items: Option<String>,
    pub phone: Option<String>,
}

impl DeliveryPatch {
    fn unchanged(row: &Delivery) -> Self {
        Self {
            status: row.status,
            amount_due: row.amount_due,
            amount_paid: row.amount_paid,
            delivery_fee: row.delivery_fee,
            items: None,
            phone: None,
        }
    }

    /// True when applying the patch would leave the row as it is.
    pub fn is_noop(&self, row: &Delivery) -> bool {
        self.status == row.status
            && self.amount_due == row.amount_due
            && self.amount_paid == row.amount_paid
            && self.delivery_fee == row.delivery_fee
            && self.items.is_none()
            && self.phone.is_none()
    }
}

/// Derive the target state for `mutation` over `row`. `tariff` is the
/// amount configured for the row's `(agency, quartier)`, when one exists.
pub fn derive(
    row: &Delivery,
    mutation: &Mutation,
    tariff: Option<Money>,
    policy: &FeePolicy,
) -> DeliveryPatch {
    match mutation {
        Mutation::Status {
            next,
            manual_fee,
            amount_paid,
        } => derive_status(row, *next, *manual_fee, *amount_paid, tariff, policy),
        Mutation::Collect { amount } => derive_collect(row, *amount, tariff),
        Mutation::Modify { amount_due, items } => derive_modify(row, *amount_due, items.clone()),
        Mutation::ChangePhone { to } => DeliveryPatch {
            phone: Some(to.clone()),
            ..DeliveryPatch::unchanged(row)
        },
    }
}

/// Fee for a transition into `delivered` or `client_absent`, in priority
/// order: explicit manual fee (zero included), existing non-zero fee on the
/// row, the agency tariff, else whatever the row already holds. A row
/// leaving a zone status has its penalty fee cleared before the lookup.
fn delivered_fee(row: &Delivery, manual_fee: Option<Money>, tariff: Option<Money>) -> Money {
    if let Some(fee) = manual_fee {
        return fee;
    }
    let existing = if leaving_zone(row.status) {
        Money::ZERO
    } else {
        row.delivery_fee
    };
    if !existing.is_zero() {
        return existing;
    }
    tariff.unwrap_or(existing)
}

fn leaving_zone(status: DeliveryStatus) -> bool {
    matches!(
        status,
        DeliveryStatus::PresentNeDecrocheZone1 | DeliveryStatus::PresentNeDecrocheZone2
    )
}

fn derive_status(
    row: &Delivery,
    next: DeliveryStatus,
    manual_fee: Option<Money>,
    explicit_paid: Option<Money>,
    tariff: Option<Money>,
    policy: &FeePolicy,
) -> DeliveryPatch {
    let mut patch = DeliveryPatch::unchanged(row);
    patch.status = next;

    match next {
        DeliveryStatus::Delivered => {
            let fee = delivered_fee(row, manual_fee, tariff);
            patch.delivery_fee = fee;
            patch.amount_paid = if let Some(paid) = explicit_paid {
                paid
            } else if row.status == DeliveryStatus::Delivered {
                // Fee already applied once; re-deriving must not subtract again.
                row.amount_paid
            } else if row.amount_paid.is_zero() && !row.amount_due.is_zero() {
                row.amount_due.sub_floor_zero(fee)
            } else if !row.amount_paid.is_zero() {
                row.amount_paid.sub_floor_zero(fee)
            } else {
                row.amount_paid
            };
        }
        DeliveryStatus::ClientAbsent => {
            patch.delivery_fee = delivered_fee(row, manual_fee, tariff);
            patch.amount_paid = Money::ZERO;
        }
        DeliveryStatus::Pickup => {
            patch.delivery_fee = policy.pickup_fee;
            patch.amount_paid = row.amount_due.sub_floor_zero(policy.pickup_fee);
        }
        DeliveryStatus::PresentNeDecrocheZone1 => {
            patch.delivery_fee = policy.zone1_fee;
            patch.amount_paid = Money::ZERO;
        }
        DeliveryStatus::PresentNeDecrocheZone2 => {
            patch.delivery_fee = policy.zone2_fee;
            patch.amount_paid = Money::ZERO;
        }
        DeliveryStatus::Failed => {
            patch.delivery_fee = Money::ZERO;
            patch.amount_paid = Money::ZERO;
        }
        DeliveryStatus::Pending | DeliveryStatus::Cancelled => {
            if row.status == DeliveryStatus::Delivered || leaving_zone(row.status) {
                patch.delivery_fee = Money::ZERO;
                patch.amount_paid = if row.status == DeliveryStatus::Delivered {
                    Money::ZERO
                } else {
                    explicit_paid.unwrap_or(row.amount_paid)
                };
            } else if let Some(paid) = explicit_paid {
                patch.amount_paid = paid;
            }
        }
    }

    patch
}

fn derive_collect(row: &Delivery, amount: Money, tariff: Option<Money>) -> DeliveryPatch {
    let mut patch = DeliveryPatch::unchanged(row);
    let collected = row.amount_paid + amount;
    patch.amount_paid = collected;

    if collected >= row.amount_due && !row.amount_due.is_zero() {
        patch.status = DeliveryStatus::Delivered;
        patch.delivery_fee = delivered_fee(row, None, tariff);
    }
    patch
}

fn derive_modify(
    row: &Delivery,
    amount_due: Option<Money>,
    items: Option<String>,
) -> DeliveryPatch {
    let mut patch = DeliveryPatch::unchanged(row);
    patch.items = items;

    if let Some(due) = amount_due {
        patch.amount_due = due;
        if row.status == DeliveryStatus::Delivered {
            patch.amount_paid = due.sub_floor_zero(row.delivery_fee);
        }
    }
    patch
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(
        status: DeliveryStatus,
        due: i64,
        paid: i64,
        fee: i64,
        quartier: Option<&str>,
    ) -> Delivery {
        Delivery {
            id: 1,
            phone: "612345678".to_string(),
            customer_name: None,
            items: "2 robes".to_string(),
            amount_due: Money::from_major(due),
            amount_paid: Money::from_major(paid),
            delivery_fee: Money::from_major(fee),
            status,
            quartier: quartier.map(str::to_string),
            notes: None,
            carrier: None,
            agency_id: Some(1),
            group_id: Some(1),
            whatsapp_message_id: Some("msg-1".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn status(next: DeliveryStatus) -> Mutation {
        Mutation::Status {
            next,
            manual_fee: None,
            amount_paid: None,
        }
    }

    #[test]
    fn test_delivered_with_tariff_from_pending() {
        // Fresh delivery, no payment yet: paid = due − tariff.
        let row = row(DeliveryStatus::Pending, 15_000, 0, 0, Some("Bonapriso"));
        let patch = derive(
            &row,
            &status(DeliveryStatus::Delivered),
            Some(Money::from_major(1000)),
            &FeePolicy::default(),
        );
        assert_eq!(patch.status, DeliveryStatus::Delivered);
        assert_eq!(patch.delivery_fee, Money::from_major(1000));
        assert_eq!(patch.amount_paid, Money::from_major(14_000));
    }

    #[test]
    fn test_delivered_with_partial_payment() {
        // Payment already on the row: the fee comes out of it once.
        let row = row(DeliveryStatus::Pending, 140_000, 50_000, 0, Some("Simbock 2"));
        let patch = derive(
            &row,
            &status(DeliveryStatus::Delivered),
            Some(Money::from_major(5000)),
            &FeePolicy::default(),
        );
        assert_eq!(patch.delivery_fee, Money::from_major(5000));
        assert_eq!(patch.amount_paid, Money::from_major(45_000));
    }

    #[test]
    fn test_delivered_redelivery_is_idempotent() {
        let base = row(DeliveryStatus::Pending, 15_000, 0, 0, Some("Bonapriso"));
        let first = derive(
            &base,
            &status(DeliveryStatus::Delivered),
            Some(Money::from_major(1000)),
            &FeePolicy::default(),
        );

        let mut delivered = base.clone();
        delivered.status = first.status;
        delivered.amount_paid = first.amount_paid;
        delivered.delivery_fee = first.delivery_fee;

        let second = derive(
            &delivered,
            &status(DeliveryStatus::Delivered),
            Some(Money::from_major(1000)),
            &FeePolicy::default(),
        );
        assert_eq!(second.amount_paid, first.amount_paid);
        assert_eq!(second.delivery_fee, first.delivery_fee);
    }

    #[test]
    fn test_manual_fee_of_zero_wins() {
        let row = row(DeliveryStatus::Pending, 10_000, 0, 0, Some("Bonapriso"));
        let patch = derive(
            &row,
            &Mutation::Status {
                next: DeliveryStatus::Delivered,
                manual_fee: Some(Money::ZERO),
                amount_paid: None,
            },
            Some(Money::from_major(1000)),
            &FeePolicy::default(),
        );
        assert_eq!(patch.delivery_fee, Money::ZERO);
        assert_eq!(patch.amount_paid, Money::from_major(10_000));
    }

    #[test]
    fn test_explicit_paid_wins() {
        let row = row(DeliveryStatus::Pending, 10_000, 0, 0, None);
        let patch = derive(
            &row,
            &Mutation::Status {
                next: DeliveryStatus::Delivered,
                manual_fee: None,
                amount_paid: Some(Money::from_major(8000)),
            },
            None,
            &FeePolicy::default(),
        );
        assert_eq!(patch.amount_paid, Money::from_major(8000));
    }

    #[test]
    fn test_client_absent_forces_zero_paid() {
        let row = row(DeliveryStatus::Pending, 10_000, 4000, 0, Some("Bonapriso"));
        let patch = derive(
            &row,
            &status(DeliveryStatus::ClientAbsent),
            Some(Money::from_major(1000)),
            &FeePolicy::default(),
        );
        assert_eq!(patch.delivery_fee, Money::from_major(1000));
        assert_eq!(patch.amount_paid, Money::ZERO);
    }

    #[test]
    fn test_pickup_fixed_fee() {
        let row = row(DeliveryStatus::Pending, 50_000, 0, 0, None);
        let patch = derive(
            &row,
            &status(DeliveryStatus::Pickup),
            None,
            &FeePolicy::default(),
        );
        assert_eq!(patch.status, DeliveryStatus::Pickup);
        assert_eq!(patch.delivery_fee, Money::from_major(1000));
        assert_eq!(patch.amount_paid, Money::from_major(49_000));
    }

    #[test]
    fn test_pickup_replaces_previous_tariff() {
        let row = row(DeliveryStatus::Delivered, 50_000, 45_000, 5000, None);
        let patch = derive(
            &row,
            &status(DeliveryStatus::Pickup),
            Some(Money::from_major(5000)),
            &FeePolicy::default(),
        );
        assert_eq!(patch.delivery_fee, Money::from_major(1000));
        assert_eq!(patch.amount_paid, Money::from_major(49_000));
    }

    #[test]
    fn test_zone_statuses() {
        let base = row(DeliveryStatus::Pending, 20_000, 3000, 0, None);
        let policy = FeePolicy::default();

        let patch = derive(&base, &status(DeliveryStatus::PresentNeDecrocheZone1), None, &policy);
        assert_eq!(patch.delivery_fee, Money::from_major(500));
        assert_eq!(patch.amount_paid, Money::ZERO);

        let patch = derive(&base, &status(DeliveryStatus::PresentNeDecrocheZone2), None, &policy);
        assert_eq!(patch.delivery_fee, Money::from_major(1000));
        assert_eq!(patch.amount_paid, Money::ZERO);
    }

    #[test]
    fn test_leaving_zone_clears_fee() {
        let row = row(
            DeliveryStatus::PresentNeDecrocheZone1,
            20_000,
            0,
            500,
            None,
        );
        let patch = derive(&row, &status(DeliveryStatus::Pending), None, &FeePolicy::default());
        assert_eq!(patch.delivery_fee, Money::ZERO);
        assert_eq!(patch.status, DeliveryStatus::Pending);
    }

    #[test]
    fn test_zone_fee_is_not_reused_as_delivered_fee() {
        let row = row(
            DeliveryStatus::PresentNeDecrocheZone2,
            20_000,
            0,
            1000,
            Some("Bonapriso"),
        );
        let patch = derive(
            &row,
            &status(DeliveryStatus::Delivered),
            Some(Money::from_major(1500)),
            &FeePolicy::default(),
        );
        // The penalty fee is cleared first, so the tariff applies.
        assert_eq!(patch.delivery_fee, Money::from_major(1500));
    }

    #[test]
    fn test_failed_refunds() {
        let row = row(DeliveryStatus::Delivered, 15_000, 14_000, 1000, None);
        let patch = derive(&row, &status(DeliveryStatus::Failed), None, &FeePolicy::default());
        assert_eq!(patch.delivery_fee, Money::ZERO);
        assert_eq!(patch.amount_paid, Money::ZERO);
    }

    #[test]
    fn test_revert_from_delivered() {
        let row = row(DeliveryStatus::Delivered, 15_000, 14_000, 1000, None);
        let patch = derive(&row, &status(DeliveryStatus::Pending), None, &FeePolicy::default());
        assert_eq!(patch.delivery_fee, Money::ZERO);
        assert_eq!(patch.amount_paid, Money::ZERO);
        assert_eq!(patch.status, DeliveryStatus::Pending);
    }

    #[test]
    fn test_delivered_pending_delivered_round_trip() {
        // tariff 5000, due 140000: delivered → pending → delivered ends
        // exactly where the first delivered landed.
        let tariff = Some(Money::from_major(5000));
        let policy = FeePolicy::default();
        let base = row(DeliveryStatus::Pending, 140_000, 0, 0, Some("Simbock 2"));

        let first = derive(&base, &status(DeliveryStatus::Delivered), tariff, &policy);

        let mut delivered = base.clone();
        delivered.status = first.status;
        delivered.amount_paid = first.amount_paid;
        delivered.delivery_fee = first.delivery_fee;

        let reverted = derive(&delivered, &status(DeliveryStatus::Pending), tariff, &policy);
        let mut pending = delivered.clone();
        pending.status = reverted.status;
        pending.amount_paid = reverted.amount_paid;
        pending.delivery_fee = reverted.delivery_fee;

        let second = derive(&pending, &status(DeliveryStatus::Delivered), tariff, &policy);
        assert_eq!(second.status, first.status);
        assert_eq!(second.amount_paid, first.amount_paid);
        assert_eq!(second.delivery_fee, first.delivery_fee);
    }

    #[test]
    fn test_collect_partial_then_complete() {
        let base = row(DeliveryStatus::Pending, 12_000, 0, 0, None);
        let policy = FeePolicy::default();

        let first = derive(
            &base,
            &Mutation::Collect { amount: Money::from_major(5000) },
            None,
            &policy,
        );
        assert_eq!(first.amount_paid, Money::from_major(5000));
        assert_eq!(first.status, DeliveryStatus::Pending);

        let mut partial = base.clone();
        partial.amount_paid = first.amount_paid;

        let second = derive(
            &partial,
            &Mutation::Collect { amount: Money::from_major(7000) },
            None,
            &policy,
        );
        assert_eq!(second.amount_paid, Money::from_major(12_000));
        assert_eq!(second.status, DeliveryStatus::Delivered);
    }

    #[test]
    fn test_modify_recomputes_paid_when_delivered() {
        let row = row(DeliveryStatus::Delivered, 15_000, 14_000, 1000, None);
        let patch = derive(
            &row,
            &Mutation::Modify {
                amount_due: Some(Money::from_major(20_000)),
                items: None,
            },
            None,
            &FeePolicy::default(),
        );
        assert_eq!(patch.amount_due, Money::from_major(20_000));
        assert_eq!(patch.amount_paid, Money::from_major(19_000));
    }

    #[test]
    fn test_modify_items_only_leaves_money_alone() {
        let row = row(DeliveryStatus::Pending, 15_000, 5000, 0, None);
        let patch = derive(
            &row,
            &Mutation::Modify {
                amount_due: None,
                items: Some("3 chemises".to_string()),
            },
            None,
            &FeePolicy::default(),
        );
        assert_eq!(patch.items.as_deref(), Some("3 chemises"));
        assert_eq!(patch.amount_due, row.amount_due);
        assert_eq!(patch.amount_paid, row.amount_paid);
    }

    #[test]
    fn test_change_phone() {
        let row = row(DeliveryStatus::Pending, 15_000, 0, 0, None);
        let patch = derive(
            &row,
            &Mutation::ChangePhone { to: "688888888".to_string() },
            None,
            &FeePolicy::default(),
        );
        assert_eq!(patch.phone.as_deref(), Some("688888888"));
        assert_eq!(patch.status, row.status);
    }
}

use crate::domain::payment::PaymentRecord;
use crate::domain::shipment::{furthest_status, was_cancelled, ShipmentStatus, StatusEntry};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefundTier {
    /// Everything captured can come back.
    Full,
    /// The deposit is forfeited; only the captured balance is refundable.
    DepositForfeited,
    NoRefund,
}

/// Refund rules keyed by the shipment's furthest-reached status. The table
/// is data, not code, so policy changes never touch the evaluator.
#[derive(Debug, Clone)]
pub struct RefundPolicy {
    tiers: HashMap<ShipmentStatus, RefundTier>,
}

impl Default for RefundPolicy {
    fn default() -> Self {
        use ShipmentStatus::*;
        let tiers = HashMap::from([
            (Pending, RefundTier::Full),
            (Confirmed, RefundTier::Full),
            (DriverAssigned, RefundTier::DepositForfeited),
            (PickupScheduled, RefundTier::DepositForfeited),
            (PickedUp, RefundTier::NoRefund),
            (InTransit, RefundTier::NoRefund),
            (Delivered, RefundTier::NoRefund),
        ]);
        RefundPolicy { tiers }
    }
}

impl RefundPolicy {
    pub fn tier_for(&self, status: ShipmentStatus) -> RefundTier {
        self.tiers.get(&status).copied().unwrap_or(RefundTier::NoRefund)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundEligibility {
    pub eligible: bool,
    pub max_refundable_cents: i64,
    pub reason_code: &'static str,
}

/// Pure eligibility check; shared by the coordinator and the read-only
/// endpoint. A cancelled shipment always gets its captured money back.
pub fn evaluate(
    history: &[StatusEntry],
    record: &PaymentRecord,
    policy: &RefundPolicy,
) -> RefundEligibility {
    let available = record.refundable_amount();
    if available <= 0 {
        return RefundEligibility {
            eligible: false,
            max_refundable_cents: 0,
            reason_code: "NOTHING_CAPTURED",
        };
    }

    if was_cancelled(history) {
        return RefundEligibility {
            eligible: true,
            max_refundable_cents: available,
            reason_code: "FULL_ON_CANCELLATION",
        };
    }

    let furthest = match furthest_status(history) {
        Some(s) => s,
        None => {
            return RefundEligibility {
                eligible: false,
                max_refundable_cents: 0,
                reason_code: "NO_STATUS_HISTORY",
            }
        }
    };

    match policy.tier_for(furthest) {
        RefundTier::Full => RefundEligibility {
            eligible: true,
            max_refundable_cents: available,
            reason_code: "FULL_BEFORE_ASSIGNMENT",
        },
        RefundTier::DepositForfeited => {
            let deposit_kept = record.deposit_amount.min(available);
            let refundable = available - deposit_kept;
            RefundEligibility {
                eligible: refundable > 0,
                max_refundable_cents: refundable,
                reason_code: "DEPOSIT_FORFEIT_AFTER_ASSIGNMENT",
            }
        }
        RefundTier::NoRefund => RefundEligibility {
            eligible: false,
            max_refundable_cents: 0,
            reason_code: "NO_REFUND_AFTER_PICKUP",
        },
    }
}

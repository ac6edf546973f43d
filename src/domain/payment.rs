use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEPOSIT_PERCENT: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentState {
    New,
    DepositPending,
    DepositCaptured,
    FinalPending,
    FinalCaptured,
    Settled,
    Cancelled,
    Refunded,
    PartiallyRefunded,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::New => "NEW",
            PaymentState::DepositPending => "DEPOSIT_PENDING",
            PaymentState::DepositCaptured => "DEPOSIT_CAPTURED",
            PaymentState::FinalPending => "FINAL_PENDING",
            PaymentState::FinalCaptured => "FINAL_CAPTURED",
            PaymentState::Settled => "SETTLED",
            PaymentState::Cancelled => "CANCELLED",
            PaymentState::Refunded => "REFUNDED",
            PaymentState::PartiallyRefunded => "PARTIALLY_REFUNDED",
        }
    }

    pub fn parse(s: &str) -> Option<PaymentState> {
        Some(match s {
            "NEW" => PaymentState::New,
            "DEPOSIT_PENDING" => PaymentState::DepositPending,
            "DEPOSIT_CAPTURED" => PaymentState::DepositCaptured,
            "FINAL_PENDING" => PaymentState::FinalPending,
            "FINAL_CAPTURED" => PaymentState::FinalCaptured,
            "SETTLED" => PaymentState::Settled,
            "CANCELLED" => PaymentState::Cancelled,
            "REFUNDED" => PaymentState::Refunded,
            "PARTIALLY_REFUNDED" => PaymentState::PartiallyRefunded,
            _ => return None,
        })
    }
}

/// The full edge set of the payment state machine. Every write path checks
/// here; there is no other way to move a record between states.
pub fn is_valid_transition(from: PaymentState, to: PaymentState) -> bool {
    use PaymentState::*;
    matches!(
        (from, to),
        (New, DepositPending)
            | (DepositPending, DepositCaptured)
            | (DepositCaptured, FinalPending)
            | (FinalPending, FinalCaptured)
            | (FinalCaptured, Settled)
            | (New, Cancelled)
            | (DepositPending, Cancelled)
            | (DepositCaptured, Refunded)
            | (DepositCaptured, PartiallyRefunded)
            | (FinalCaptured, Refunded)
            | (FinalCaptured, PartiallyRefunded)
            | (Settled, Refunded)
            | (Settled, PartiallyRefunded)
            | (PartiallyRefunded, Refunded)
            | (PartiallyRefunded, PartiallyRefunded)
    )
}

/// Split a total into (deposit, balance). The deposit is 20% rounded half-up;
/// the rounding remainder always lands on the balance so the two legs add up
/// to the total exactly.
pub fn split_amounts(total_cents: i64) -> (i64, i64) {
    let deposit = (total_cents * DEPOSIT_PERCENT + 50) / 100;
    (deposit, total_cents - deposit)
}

pub const INTENT_SUCCEEDED: &str = "succeeded";
pub const INTENT_FAILED: &str = "failed";
pub const INTENT_CANCELED: &str = "canceled";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub shipment_id: Uuid,
    pub total_amount: i64,
    pub deposit_amount: i64,
    pub final_amount: i64,
    pub currency: String,
    pub deposit_intent_id: Option<String>,
    pub deposit_status: Option<String>,
    pub final_intent_id: Option<String>,
    pub final_status: Option<String>,
    pub refunded_amount: i64,
    pub state: PaymentState,
    pub version: i32,
    pub last_event_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    pub fn new(shipment_id: Uuid, total_cents: i64, currency: &str) -> Self {
        let (deposit, balance) = split_amounts(total_cents);
        let now = Utc::now();
        PaymentRecord {
            shipment_id,
            total_amount: total_cents,
            deposit_amount: deposit,
            final_amount: balance,
            currency: currency.to_string(),
            deposit_intent_id: None,
            deposit_status: None,
            final_intent_id: None,
            final_status: None,
            refunded_amount: 0,
            state: PaymentState::New,
            version: 0,
            last_event_id: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn deposit_captured(&self) -> bool {
        self.deposit_status.as_deref() == Some(INTENT_SUCCEEDED)
    }

    pub fn final_captured(&self) -> bool {
        self.final_status.as_deref() == Some(INTENT_SUCCEEDED)
    }

    /// Cents actually collected so far; refunds do not subtract from this.
    pub fn captured_amount(&self) -> i64 {
        let mut captured = 0;
        if self.deposit_captured() {
            captured += self.deposit_amount;
        }
        if self.final_captured() {
            captured += self.final_amount;
        }
        captured
    }

    pub fn refundable_amount(&self) -> i64 {
        self.captured_amount() - self.refunded_amount
    }

    /// Checked state move; callers persist only after this succeeds.
    pub fn transition(&mut self, to: PaymentState) -> Result<(), crate::error::CoreError> {
        if !is_valid_transition(self.state, to) {
            return Err(crate::error::CoreError::state_conflict(
                self.state,
                format!("no edge {} -> {}", self.state.as_str(), to.as_str()),
            ));
        }
        self.state = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_is_exact_for_any_total() {
        for total in [0, 1, 99, 100, 10001, 15000, 30000, 999_999_999] {
            let (deposit, balance) = split_amounts(total);
            assert_eq!(deposit + balance, total, "total={total}");
            assert!(deposit >= 0 && balance >= 0);
        }
    }

    #[test]
    fn split_rounds_half_up() {
        // 20% of 10002 is 2000.4 -> 2000; of 10003 is 2000.6 -> 2001
        assert_eq!(split_amounts(10002).0, 2000);
        assert_eq!(split_amounts(10003).0, 2001);
        // exactly .5 rounds up
        assert_eq!(split_amounts(12).0, 2);
        assert_eq!(split_amounts(30000), (6000, 24000));
    }

    #[test]
    fn happy_path_edges_are_valid() {
        use PaymentState::*;
        let chain = [
            New,
            DepositPending,
            DepositCaptured,
            FinalPending,
            FinalCaptured,
            Settled,
        ];
        for pair in chain.windows(2) {
            assert!(is_valid_transition(pair[0], pair[1]), "{pair:?}");
        }
    }

    #[test]
    fn skipping_capture_is_rejected() {
        use PaymentState::*;
        assert!(!is_valid_transition(DepositPending, FinalPending));
        assert!(!is_valid_transition(New, DepositCaptured));
        assert!(!is_valid_transition(DepositCaptured, Settled));
    }

    #[test]
    fn cancel_only_before_capture() {
        use PaymentState::*;
        assert!(is_valid_transition(DepositPending, Cancelled));
        assert!(!is_valid_transition(DepositCaptured, Cancelled));
        assert!(!is_valid_transition(Settled, Cancelled));
    }

    #[test]
    fn state_round_trips_through_text() {
        use PaymentState::*;
        for state in [
            New,
            DepositPending,
            DepositCaptured,
            FinalPending,
            FinalCaptured,
            Settled,
            Cancelled,
            Refunded,
            PartiallyRefunded,
        ] {
            assert_eq!(PaymentState::parse(state.as_str()), Some(state));
        }
        assert_eq!(PaymentState::parse("APPROVED"), None);
    }
}

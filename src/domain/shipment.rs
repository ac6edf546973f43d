use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    Pending,
    Confirmed,
    DriverAssigned,
    PickupScheduled,
    PickedUp,
    InTransit,
    Delivered,
    Cancelled,
}

impl ShipmentStatus {
    /// Position along the shipment lifecycle; used to find the
    /// furthest-reached status in a history. Cancellation is not progress.
    pub fn rank(&self) -> u8 {
        match self {
            ShipmentStatus::Cancelled => 0,
            ShipmentStatus::Pending => 1,
            ShipmentStatus::Confirmed => 2,
            ShipmentStatus::DriverAssigned => 3,
            ShipmentStatus::PickupScheduled => 4,
            ShipmentStatus::PickedUp => 5,
            ShipmentStatus::InTransit => 6,
            ShipmentStatus::Delivered => 7,
        }
    }

    pub fn delivery_eligible(&self) -> bool {
        matches!(self, ShipmentStatus::Delivered)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEntry {
    pub status: ShipmentStatus,
    pub at: DateTime<Utc>,
}

/// Furthest-reached progress status in a history, ignoring cancellation.
/// Returns None for an empty history or one that only ever cancelled.
pub fn furthest_status(history: &[StatusEntry]) -> Option<ShipmentStatus> {
    history
        .iter()
        .map(|e| e.status)
        .filter(|s| *s != ShipmentStatus::Cancelled)
        .max_by_key(|s| s.rank())
}

pub fn was_cancelled(history: &[StatusEntry]) -> bool {
    history.iter().any(|e| e.status == ShipmentStatus::Cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(status: ShipmentStatus) -> StatusEntry {
        StatusEntry {
            status,
            at: Utc::now(),
        }
    }

    #[test]
    fn furthest_ignores_order_of_delivery() {
        let history = vec![
            entry(ShipmentStatus::PickedUp),
            entry(ShipmentStatus::Confirmed),
            entry(ShipmentStatus::Pending),
        ];
        assert_eq!(furthest_status(&history), Some(ShipmentStatus::PickedUp));
    }

    #[test]
    fn cancellation_is_not_progress() {
        let history = vec![entry(ShipmentStatus::Confirmed), entry(ShipmentStatus::Cancelled)];
        assert_eq!(furthest_status(&history), Some(ShipmentStatus::Confirmed));
        assert!(was_cancelled(&history));
    }
}

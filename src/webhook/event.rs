use crate::error::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const EVENT_INTENT_SUCCEEDED: &str = "payment_intent.succeeded";
pub const EVENT_INTENT_FAILED: &str = "payment_intent.payment_failed";
pub const EVENT_INTENT_CANCELED: &str = "payment_intent.canceled";
pub const EVENT_CHARGE_REFUNDED: &str = "charge.refunded";

/// A verified gateway event. `id` is monotonic per the gateway's ordering;
/// the reconciler uses it for apply-once semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEvent {
    pub id: i64,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    pub intent_id: String,
    pub shipment_id: Uuid,
    /// For `charge.refunded`: the gateway's cumulative refunded total for
    /// the payment, not the delta of the triggering refund.
    pub amount_minor: Option<i64>,
}

pub fn parse_event(payload: &[u8]) -> Result<GatewayEvent, CoreError> {
    serde_json::from_slice(payload)
        .map_err(|e| CoreError::validation(format!("malformed webhook payload: {e}")))
}

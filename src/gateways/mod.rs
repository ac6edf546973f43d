use crate::error::CoreError;
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

pub mod mock;
pub mod stripe;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargePhase {
    Deposit,
    Final,
}

impl ChargePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChargePhase::Deposit => "deposit",
            ChargePhase::Final => "final",
        }
    }

    /// Idempotency key shared by every retry of the same logical charge.
    pub fn idempotency_key(&self, shipment_id: Uuid) -> String {
        format!("{}:{}", shipment_id, self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct IntentRequest {
    pub shipment_id: Uuid,
    pub phase: ChargePhase,
    pub amount_minor: i64,
    pub currency: String,
    pub idempotency_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentStatus {
    RequiresConfirmation,
    Succeeded,
    Failed,
    Canceled,
}

#[derive(Debug, Clone)]
pub struct GatewayIntent {
    pub intent_id: String,
    pub status: IntentStatus,
}

#[derive(Debug, Clone)]
pub struct GatewayRefund {
    pub refund_id: String,
    pub amount_minor: i64,
}

#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &'static str;

    async fn create_intent(&self, request: IntentRequest) -> Result<GatewayIntent, CoreError>;

    async fn confirm_intent(
        &self,
        intent_id: &str,
        payment_method_ref: &str,
    ) -> Result<GatewayIntent, CoreError>;

    async fn cancel_intent(&self, intent_id: &str) -> Result<GatewayIntent, CoreError>;

    async fn create_refund(
        &self,
        intent_id: &str,
        amount_minor: i64,
        reason: &str,
        idempotency_key: &str,
    ) -> Result<GatewayRefund, CoreError>;
}

pub const GATEWAY_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(200);

/// Bounded retry with exponential backoff. Only transient gateway errors are
/// retried; the idempotency key carried by the call keeps retries from
/// double-charging.
pub async fn with_retry<T, F, Fut>(attempts: u32, mut call: F) -> Result<T, CoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CoreError>>,
{
    let mut backoff = INITIAL_BACKOFF;
    let mut last_err = None;
    for attempt in 1..=attempts {
        match call().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_retryable() => {
                tracing::warn!(attempt, error = %e, "transient gateway error, retrying");
                last_err = Some(e);
                if attempt < attempts {
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| CoreError::gateway_transient("retry budget exhausted")))
}

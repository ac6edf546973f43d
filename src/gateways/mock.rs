use crate::error::CoreError;
use crate::gateways::{GatewayIntent, GatewayRefund, IntentRequest, IntentStatus, PaymentGateway};
use std::sync::Mutex;

/// Scripted gateway for tests and local runs. Records every call so tests
/// can assert how many intents were actually created and with which
/// idempotency keys.
pub struct MockGateway {
    pub behavior: String,
    pub calls: Mutex<Vec<String>>,
}

impl MockGateway {
    pub fn new(behavior: &str) -> Self {
        MockGateway {
            behavior: behavior.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("mock gateway lock").len()
    }

    pub fn recorded_calls(&self) -> Vec<String> {
        self.calls.lock().expect("mock gateway lock").clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("mock gateway lock").push(call);
    }

    fn scripted_failure(&self) -> Option<CoreError> {
        match self.behavior.as_str() {
            "ALWAYS_DECLINE" => Some(CoreError::gateway_client("mock decline")),
            "ALWAYS_TIMEOUT" => Some(CoreError::gateway_transient("mock timeout")),
            _ => None,
        }
    }
}

#[async_trait::async_trait]
impl PaymentGateway for MockGateway {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_intent(&self, request: IntentRequest) -> Result<GatewayIntent, CoreError> {
        self.record(format!("create:{}", request.idempotency_key));
        if let Some(err) = self.scripted_failure() {
            return Err(err);
        }
        Ok(GatewayIntent {
            intent_id: format!("mock_pi_{}", request.idempotency_key),
            status: IntentStatus::RequiresConfirmation,
        })
    }

    async fn confirm_intent(
        &self,
        intent_id: &str,
        _payment_method_ref: &str,
    ) -> Result<GatewayIntent, CoreError> {
        self.record(format!("confirm:{intent_id}"));
        if let Some(err) = self.scripted_failure() {
            return Err(err);
        }
        // Intent creation works but confirmation declines; used to test that
        // a failed confirm leaves the record untouched.
        if self.behavior == "DECLINE_CONFIRM" {
            return Err(CoreError::gateway_client("mock decline"));
        }
        Ok(GatewayIntent {
            intent_id: intent_id.to_string(),
            status: IntentStatus::Succeeded,
        })
    }

    async fn cancel_intent(&self, intent_id: &str) -> Result<GatewayIntent, CoreError> {
        self.record(format!("cancel:{intent_id}"));
        if let Some(err) = self.scripted_failure() {
            return Err(err);
        }
        Ok(GatewayIntent {
            intent_id: intent_id.to_string(),
            status: IntentStatus::Canceled,
        })
    }

    async fn create_refund(
        &self,
        intent_id: &str,
        amount_minor: i64,
        _reason: &str,
        idempotency_key: &str,
    ) -> Result<GatewayRefund, CoreError> {
        self.record(format!("refund:{idempotency_key}"));
        if let Some(err) = self.scripted_failure() {
            return Err(err);
        }
        Ok(GatewayRefund {
            refund_id: format!("mock_re_{intent_id}_{amount_minor}"),
            amount_minor,
        })
    }
}

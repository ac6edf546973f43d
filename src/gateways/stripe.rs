use crate::error::CoreError;
use crate::gateways::{GatewayIntent, GatewayRefund, IntentRequest, IntentStatus, PaymentGateway};

pub struct StripeGateway {
    pub base_url: String,
    pub secret_key: String,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

impl StripeGateway {
    fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }

    async fn send_form(
        &self,
        path: &str,
        params: &[(&str, String)],
        idempotency_key: Option<&str>,
    ) -> Result<serde_json::Value, CoreError> {
        let mut req = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(params)
            .timeout(self.timeout());
        if let Some(key) = idempotency_key {
            req = req.header("Idempotency-Key", key);
        }

        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                CoreError::gateway_transient("gateway timeout")
            } else {
                CoreError::gateway_transient(format!("network error: {e}"))
            }
        })?;

        let status = resp.status();
        let body: serde_json::Value = resp.json().await.unwrap_or_default();
        if status.is_success() {
            return Ok(body);
        }

        let message = body
            .pointer("/error/message")
            .and_then(|m| m.as_str())
            .unwrap_or("no error body")
            .to_string();
        if status.is_server_error()
            || status == reqwest::StatusCode::REQUEST_TIMEOUT
            || status == reqwest::StatusCode::TOO_MANY_REQUESTS
        {
            Err(CoreError::gateway_transient(format!(
                "HTTP {}: {message}",
                status.as_u16()
            )))
        } else {
            Err(CoreError::gateway_client(format!(
                "HTTP {}: {message}",
                status.as_u16()
            )))
        }
    }

    fn parse_intent(body: &serde_json::Value) -> Result<GatewayIntent, CoreError> {
        let intent_id = body
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| CoreError::gateway_client("intent response missing id"))?
            .to_string();
        let status = match body.get("status").and_then(|v| v.as_str()).unwrap_or("") {
            "succeeded" => IntentStatus::Succeeded,
            "canceled" => IntentStatus::Canceled,
            "requires_payment_method" | "requires_confirmation" | "requires_action"
            | "processing" => IntentStatus::RequiresConfirmation,
            _ => IntentStatus::Failed,
        };
        Ok(GatewayIntent { intent_id, status })
    }
}

#[async_trait::async_trait]
impl PaymentGateway for StripeGateway {
    fn name(&self) -> &'static str {
        "stripe"
    }

    async fn create_intent(&self, request: IntentRequest) -> Result<GatewayIntent, CoreError> {
        let body = self
            .send_form(
                "/v1/payment_intents",
                &[
                    ("amount", request.amount_minor.to_string()),
                    ("currency", request.currency.to_lowercase()),
                    ("metadata[shipment_id]", request.shipment_id.to_string()),
                    ("metadata[phase]", request.phase.as_str().to_string()),
                ],
                Some(&request.idempotency_key),
            )
            .await?;
        Self::parse_intent(&body)
    }

    async fn confirm_intent(
        &self,
        intent_id: &str,
        payment_method_ref: &str,
    ) -> Result<GatewayIntent, CoreError> {
        let body = self
            .send_form(
                &format!("/v1/payment_intents/{intent_id}/confirm"),
                &[("payment_method", payment_method_ref.to_string())],
                None,
            )
            .await?;
        Self::parse_intent(&body)
    }

    async fn cancel_intent(&self, intent_id: &str) -> Result<GatewayIntent, CoreError> {
        let body = self
            .send_form(&format!("/v1/payment_intents/{intent_id}/cancel"), &[], None)
            .await?;
        Self::parse_intent(&body)
    }

    async fn create_refund(
        &self,
        intent_id: &str,
        amount_minor: i64,
        reason: &str,
        idempotency_key: &str,
    ) -> Result<GatewayRefund, CoreError> {
        let body = self
            .send_form(
                "/v1/refunds",
                &[
                    ("payment_intent", intent_id.to_string()),
                    ("amount", amount_minor.to_string()),
                    ("metadata[reason]", reason.to_string()),
                ],
                Some(idempotency_key),
            )
            .await?;
        let refund_id = body
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| CoreError::gateway_client("refund response missing id"))?
            .to_string();
        Ok(GatewayRefund {
            refund_id,
            amount_minor: body
                .get("amount")
                .and_then(|v| v.as_i64())
                .unwrap_or(amount_minor),
        })
    }
}

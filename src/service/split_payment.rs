use crate::domain::payment::{
    PaymentRecord, PaymentState, INTENT_CANCELED, INTENT_SUCCEEDED,
};
use crate::domain::ports::{PaymentLedger, ShipmentStatusSource};
use crate::domain::quote::Quote;
use crate::error::CoreError;
use crate::gateways::{with_retry, ChargePhase, IntentRequest, IntentStatus, PaymentGateway, GATEWAY_ATTEMPTS};
use crate::service::refund_policy::{evaluate, RefundEligibility, RefundPolicy};
use std::sync::Arc;
use uuid::Uuid;

/// How many times a version-checked write is retried before giving up. A
/// conflict means the webhook reconciler (or another caller) got there
/// first; each retry re-reads and re-guards.
const CAS_ATTEMPTS: u32 = 5;

enum Commit {
    Write,
    AlreadyDone,
}

/// Orchestrates the two-phase payment against the gateway and the ledger.
/// Every mutation is load -> guard -> gateway call -> compare-and-set, so a
/// concurrent webhook can never be overwritten blindly.
pub struct SplitPaymentCoordinator {
    pub ledger: Arc<dyn PaymentLedger>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub shipments: Arc<dyn ShipmentStatusSource>,
    pub refund_policy: RefundPolicy,
    pub currency: String,
}

impl SplitPaymentCoordinator {
    async fn load(&self, shipment_id: Uuid) -> Result<PaymentRecord, CoreError> {
        self.ledger
            .find(shipment_id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("no payment record for shipment {shipment_id}")))
    }

    /// Re-read/mutate/compare-and-set loop. The closure inspects the fresh
    /// row and either rewrites it, declares the work already done, or bails
    /// with a guard error.
    async fn commit<F>(&self, shipment_id: Uuid, mut mutate: F) -> Result<PaymentRecord, CoreError>
    where
        F: FnMut(&mut PaymentRecord) -> Result<Commit, CoreError>,
    {
        for _ in 0..CAS_ATTEMPTS {
            let current = self.load(shipment_id).await?;
            let mut next = current.clone();
            match mutate(&mut next)? {
                Commit::AlreadyDone => return Ok(current),
                Commit::Write => {
                    if self.ledger.update(&next, current.version).await? {
                        next.version = current.version + 1;
                        tracing::info!(
                            %shipment_id,
                            from = current.state.as_str(),
                            to = next.state.as_str(),
                            "payment record updated"
                        );
                        return Ok(next);
                    }
                    tracing::debug!(%shipment_id, "version conflict, retrying");
                }
            }
        }
        Err(CoreError::Internal(anyhow::anyhow!(
            "gave up after {CAS_ATTEMPTS} version conflicts for shipment {shipment_id}"
        )))
    }

    /// Idempotent booking entry point: an existing record is returned as-is
    /// and no second gateway intent is created.
    pub async fn create_deposit(
        &self,
        shipment_id: Uuid,
        quote: &Quote,
    ) -> Result<PaymentRecord, CoreError> {
        if let Some(existing) = self.ledger.find(shipment_id).await? {
            return Ok(existing);
        }

        let mut record = PaymentRecord::new(shipment_id, quote.total_cents, &self.currency);
        let request = IntentRequest {
            shipment_id,
            phase: ChargePhase::Deposit,
            amount_minor: record.deposit_amount,
            currency: record.currency.clone(),
            idempotency_key: ChargePhase::Deposit.idempotency_key(shipment_id),
        };
        let intent = with_retry(GATEWAY_ATTEMPTS, || {
            self.gateway.create_intent(request.clone())
        })
        .await?;

        record.deposit_intent_id = Some(intent.intent_id);
        record.transition(PaymentState::DepositPending)?;

        if self.ledger.insert(&record).await? {
            tracing::info!(%shipment_id, deposit = record.deposit_amount, "deposit intent created");
            return Ok(record);
        }
        // Lost the insert race; the winner's row is the authoritative one.
        self.load(shipment_id).await
    }

    pub async fn confirm_deposit(
        &self,
        shipment_id: Uuid,
        payment_method_ref: &str,
    ) -> Result<PaymentRecord, CoreError> {
        let record = self.load(shipment_id).await?;
        if record.deposit_captured() {
            return Ok(record);
        }
        if record.state != PaymentState::DepositPending {
            return Err(CoreError::state_conflict(
                record.state,
                "deposit confirmation requires a pending deposit",
            ));
        }
        let intent_id = record
            .deposit_intent_id
            .clone()
            .ok_or_else(|| CoreError::Internal(anyhow::anyhow!("pending deposit without intent id")))?;

        let confirmed = with_retry(GATEWAY_ATTEMPTS, || {
            self.gateway.confirm_intent(&intent_id, payment_method_ref)
        })
        .await?;
        if confirmed.status != IntentStatus::Succeeded {
            return Err(CoreError::gateway_client("deposit confirmation did not succeed"));
        }

        self.commit(shipment_id, |rec| {
            if rec.deposit_captured() {
                // The webhook got there first; nothing left to write.
                return Ok(Commit::AlreadyDone);
            }
            rec.transition(PaymentState::DepositCaptured)?;
            rec.deposit_status = Some(INTENT_SUCCEEDED.to_string());
            Ok(Commit::Write)
        })
        .await
    }

    /// Allowed only once the deposit is captured and the shipment has
    /// reached a delivery-eligible status.
    pub async fn create_final_charge(&self, shipment_id: Uuid) -> Result<PaymentRecord, CoreError> {
        let record = self.load(shipment_id).await?;
        if record.state != PaymentState::DepositCaptured {
            return Err(CoreError::state_conflict(
                record.state,
                "final charge requires a captured deposit",
            ));
        }

        let status = self.shipments.current_status(shipment_id).await?;
        if !status.delivery_eligible() {
            return Err(CoreError::state_conflict(
                record.state,
                format!("shipment not delivery-eligible (status {status:?})"),
            ));
        }

        let request = IntentRequest {
            shipment_id,
            phase: ChargePhase::Final,
            amount_minor: record.final_amount,
            currency: record.currency.clone(),
            idempotency_key: ChargePhase::Final.idempotency_key(shipment_id),
        };
        let intent = with_retry(GATEWAY_ATTEMPTS, || {
            self.gateway.create_intent(request.clone())
        })
        .await?;

        self.commit(shipment_id, |rec| {
            if rec.final_intent_id.is_some() {
                return Ok(Commit::AlreadyDone);
            }
            rec.transition(PaymentState::FinalPending)?;
            rec.final_intent_id = Some(intent.intent_id.clone());
            Ok(Commit::Write)
        })
        .await
    }

    pub async fn confirm_final(
        &self,
        shipment_id: Uuid,
        payment_method_ref: &str,
    ) -> Result<PaymentRecord, CoreError> {
        let record = self.load(shipment_id).await?;
        if record.final_captured() {
            return Ok(record);
        }
        if record.state != PaymentState::FinalPending {
            return Err(CoreError::state_conflict(
                record.state,
                "final confirmation requires a pending final charge",
            ));
        }
        let intent_id = record
            .final_intent_id
            .clone()
            .ok_or_else(|| CoreError::Internal(anyhow::anyhow!("pending final without intent id")))?;

        let confirmed = with_retry(GATEWAY_ATTEMPTS, || {
            self.gateway.confirm_intent(&intent_id, payment_method_ref)
        })
        .await?;
        if confirmed.status != IntentStatus::Succeeded {
            return Err(CoreError::gateway_client("final confirmation did not succeed"));
        }

        self.commit(shipment_id, |rec| {
            if rec.final_captured() {
                return Ok(Commit::AlreadyDone);
            }
            rec.transition(PaymentState::FinalCaptured)?;
            rec.transition(PaymentState::Settled)?;
            rec.final_status = Some(INTENT_SUCCEEDED.to_string());
            Ok(Commit::Write)
        })
        .await
    }

    /// Cancellation is a side branch available only before the deposit is
    /// captured.
    pub async fn cancel_payment(&self, shipment_id: Uuid) -> Result<PaymentRecord, CoreError> {
        let record = self.load(shipment_id).await?;
        if record.state == PaymentState::Cancelled {
            return Ok(record);
        }
        if !matches!(record.state, PaymentState::New | PaymentState::DepositPending) {
            return Err(CoreError::state_conflict(
                record.state,
                "cancellation is only possible before the deposit is captured",
            ));
        }

        if let Some(intent_id) = record.deposit_intent_id.clone() {
            with_retry(GATEWAY_ATTEMPTS, || self.gateway.cancel_intent(&intent_id)).await?;
        }

        self.commit(shipment_id, |rec| {
            if rec.state == PaymentState::Cancelled {
                return Ok(Commit::AlreadyDone);
            }
            rec.transition(PaymentState::Cancelled)?;
            rec.deposit_status = Some(INTENT_CANCELED.to_string());
            Ok(Commit::Write)
        })
        .await
    }

    pub async fn refund_eligibility(
        &self,
        shipment_id: Uuid,
    ) -> Result<RefundEligibility, CoreError> {
        let record = self.load(shipment_id).await?;
        let history = self.shipments.status_history(shipment_id).await?;
        Ok(evaluate(&history, &record, &self.refund_policy))
    }

    pub async fn process_refund(
        &self,
        shipment_id: Uuid,
        amount: i64,
        reason: &str,
    ) -> Result<PaymentRecord, CoreError> {
        if amount <= 0 {
            return Err(CoreError::validation("refund amount must be > 0"));
        }
        let record = self.load(shipment_id).await?;
        if amount > record.refundable_amount() {
            return Err(CoreError::validation(format!(
                "refund amount {amount} exceeds refundable {}",
                record.refundable_amount()
            )));
        }

        let history = self.shipments.status_history(shipment_id).await?;
        let eligibility = evaluate(&history, &record, &self.refund_policy);
        if !eligibility.eligible {
            return Err(CoreError::state_conflict(record.state, eligibility.reason_code));
        }
        if amount > eligibility.max_refundable_cents {
            return Err(CoreError::validation(format!(
                "refund amount {amount} exceeds policy maximum {}",
                eligibility.max_refundable_cents
            )));
        }

        // Draw the refund from the captured intents newest-first. The split
        // of past refunds across intents is derived from refunded_amount, so
        // it stays deterministic without extra columns.
        let final_captured = if record.final_captured() { record.final_amount } else { 0 };
        let prior_from_final = record.refunded_amount.min(final_captured);
        let final_available = final_captured - prior_from_final;

        let mut remaining = amount;
        let mut legs: Vec<(String, i64, &'static str)> = Vec::new();
        if final_available > 0 {
            let portion = remaining.min(final_available);
            let intent = record.final_intent_id.clone().ok_or_else(|| {
                CoreError::Internal(anyhow::anyhow!("captured final without intent id"))
            })?;
            legs.push((intent, portion, "final"));
            remaining -= portion;
        }
        if remaining > 0 {
            let intent = record.deposit_intent_id.clone().ok_or_else(|| {
                CoreError::Internal(anyhow::anyhow!("captured deposit without intent id"))
            })?;
            legs.push((intent, remaining, "deposit"));
        }

        for (intent_id, portion, phase) in &legs {
            let key = format!(
                "{}:refund:{}:{}+{}",
                shipment_id, phase, record.refunded_amount, amount
            );
            with_retry(GATEWAY_ATTEMPTS, || {
                self.gateway.create_refund(intent_id, *portion, reason, &key)
            })
            .await?;
        }

        // The gateway will also echo this refund back as a charge.refunded
        // event. Committing toward a fixed cumulative target (instead of
        // adding to whatever is on the re-read row) lets whichever writer
        // lands second recognize the money as already accounted for.
        let captured = record.captured_amount();
        let target_refunded = record.refunded_amount + amount;
        self.commit(shipment_id, |rec| {
            if rec.refunded_amount >= target_refunded {
                return Ok(Commit::AlreadyDone);
            }
            let target = if target_refunded >= captured {
                PaymentState::Refunded
            } else {
                PaymentState::PartiallyRefunded
            };
            if rec.state != target {
                rec.transition(target)?;
            }
            rec.refunded_amount = target_refunded;
            Ok(Commit::Write)
        })
        .await
    }
}

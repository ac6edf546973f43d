use crate::domain::payment::{
    is_valid_transition, PaymentState, INTENT_CANCELED, INTENT_FAILED, INTENT_SUCCEEDED,
};
use crate::domain::ports::PaymentLedger;
use crate::error::CoreError;
use crate::webhook::event::{
    GatewayEvent, EVENT_CHARGE_REFUNDED, EVENT_INTENT_CANCELED, EVENT_INTENT_FAILED,
    EVENT_INTENT_SUCCEEDED,
};
use std::sync::Arc;
use uuid::Uuid;

const CAS_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The event moved the record (or converged on the state the
    /// synchronous writer already reached) and last_event_id advanced.
    Applied,
    /// Duplicate or out-of-order replay; absorbed without any write.
    Stale,
    /// The event did not map onto a valid edge; logged and dropped so a
    /// later correct event can still land.
    Dropped,
    /// No payment record for the shipment the event names.
    UnknownShipment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChargeLeg {
    Deposit,
    Final,
}

/// Applies verified gateway events to the ledger. Events arrive at least
/// once and possibly out of order; last_event_id plus the version
/// compare-and-set give apply-once semantics against the synchronous
/// coordinator.
pub struct WebhookReconciler {
    pub ledger: Arc<dyn PaymentLedger>,
}

impl WebhookReconciler {
    pub async fn apply(&self, event: &GatewayEvent) -> Result<ReconcileOutcome, CoreError> {
        let shipment_id = event.data.shipment_id;
        for _ in 0..CAS_ATTEMPTS {
            let record = match self.ledger.find(shipment_id).await? {
                Some(r) => r,
                None => {
                    tracing::warn!(%shipment_id, event_id = event.id, "event for unknown shipment");
                    return Ok(ReconcileOutcome::UnknownShipment);
                }
            };

            if event.id <= record.last_event_id {
                tracing::debug!(
                    %shipment_id,
                    event_id = event.id,
                    last_event_id = record.last_event_id,
                    "stale event absorbed"
                );
                return Ok(ReconcileOutcome::Stale);
            }

            let mut next = record.clone();
            match self.reduce(&mut next, event, shipment_id)? {
                ReconcileOutcome::Dropped => return Ok(ReconcileOutcome::Dropped),
                ReconcileOutcome::Applied => {
                    next.last_event_id = event.id;
                    if self.ledger.update(&next, record.version).await? {
                        tracing::info!(
                            %shipment_id,
                            event_id = event.id,
                            event_type = %event.event_type,
                            state = next.state.as_str(),
                            "webhook event applied"
                        );
                        return Ok(ReconcileOutcome::Applied);
                    }
                    // A synchronous writer moved the row; re-read and re-judge.
                }
                other => return Ok(other),
            }
        }
        Err(CoreError::Internal(anyhow::anyhow!(
            "gave up after {CAS_ATTEMPTS} version conflicts applying event {}",
            event.id
        )))
    }

    /// Mutates `next` per the event, or signals Dropped. State moves go
    /// through the transition table; an edge to the current state means the
    /// synchronous path already won and only last_event_id needs to move.
    fn reduce(
        &self,
        next: &mut crate::domain::payment::PaymentRecord,
        event: &GatewayEvent,
        shipment_id: Uuid,
    ) -> Result<ReconcileOutcome, CoreError> {
        match event.event_type.as_str() {
            EVENT_INTENT_SUCCEEDED => {
                let leg = match self.match_leg(next, &event.data.intent_id) {
                    Some(l) => l,
                    None => return self.drop_event(shipment_id, event, "unmatched intent"),
                };
                let already_captured = match leg {
                    ChargeLeg::Deposit => next.deposit_captured(),
                    ChargeLeg::Final => next.final_captured(),
                };
                if already_captured {
                    // Synchronous confirmation already recorded this capture;
                    // only last_event_id needs to move.
                    return Ok(ReconcileOutcome::Applied);
                }
                let target = match leg {
                    ChargeLeg::Deposit => PaymentState::DepositCaptured,
                    ChargeLeg::Final => PaymentState::FinalCaptured,
                };
                if next.state != target {
                    if !is_valid_transition(next.state, target) {
                        return self.drop_event(shipment_id, event, "invalid edge");
                    }
                    next.state = target;
                }
                match leg {
                    ChargeLeg::Deposit => next.deposit_status = Some(INTENT_SUCCEEDED.to_string()),
                    ChargeLeg::Final => {
                        next.final_status = Some(INTENT_SUCCEEDED.to_string());
                        // Capturing the balance settles the record.
                        if is_valid_transition(next.state, PaymentState::Settled) {
                            next.state = PaymentState::Settled;
                        }
                    }
                }
                Ok(ReconcileOutcome::Applied)
            }
            EVENT_INTENT_FAILED => {
                let leg = match self.match_leg(next, &event.data.intent_id) {
                    Some(l) => l,
                    None => return self.drop_event(shipment_id, event, "unmatched intent"),
                };
                // A failed attempt leaves the state machine where it is; the
                // caller can confirm again. Only the leg status is recorded.
                match leg {
                    ChargeLeg::Deposit => next.deposit_status = Some(INTENT_FAILED.to_string()),
                    ChargeLeg::Final => next.final_status = Some(INTENT_FAILED.to_string()),
                }
                Ok(ReconcileOutcome::Applied)
            }
            EVENT_INTENT_CANCELED => {
                let leg = match self.match_leg(next, &event.data.intent_id) {
                    Some(l) => l,
                    None => return self.drop_event(shipment_id, event, "unmatched intent"),
                };
                if leg != ChargeLeg::Deposit {
                    return self.drop_event(shipment_id, event, "only the deposit cancels a payment");
                }
                if next.state != PaymentState::Cancelled {
                    if !is_valid_transition(next.state, PaymentState::Cancelled) {
                        return self.drop_event(shipment_id, event, "invalid edge");
                    }
                    next.state = PaymentState::Cancelled;
                }
                next.deposit_status = Some(INTENT_CANCELED.to_string());
                Ok(ReconcileOutcome::Applied)
            }
            EVENT_CHARGE_REFUNDED => {
                // amount_minor carries the gateway's cumulative refunded
                // total, so an echo of a refund the coordinator already
                // recorded reconciles instead of double-counting.
                let reported = match event.data.amount_minor {
                    Some(a) if a > 0 => a,
                    _ => return self.drop_event(shipment_id, event, "refund event without amount"),
                };
                if reported > next.captured_amount() {
                    return self.drop_event(shipment_id, event, "refund exceeds captured amount");
                }
                if reported <= next.refunded_amount {
                    // Already reflected; only last_event_id needs to move.
                    return Ok(ReconcileOutcome::Applied);
                }
                let target = if reported >= next.captured_amount() {
                    PaymentState::Refunded
                } else {
                    PaymentState::PartiallyRefunded
                };
                if next.state != target {
                    if !is_valid_transition(next.state, target) {
                        return self.drop_event(shipment_id, event, "invalid edge");
                    }
                    next.state = target;
                }
                next.refunded_amount = reported;
                Ok(ReconcileOutcome::Applied)
            }
            other => self.drop_event(shipment_id, event, other),
        }
    }

    fn match_leg(
        &self,
        record: &crate::domain::payment::PaymentRecord,
        intent_id: &str,
    ) -> Option<ChargeLeg> {
        if record.deposit_intent_id.as_deref() == Some(intent_id) {
            Some(ChargeLeg::Deposit)
        } else if record.final_intent_id.as_deref() == Some(intent_id) {
            Some(ChargeLeg::Final)
        } else {
            None
        }
    }

    fn drop_event(
        &self,
        shipment_id: Uuid,
        event: &GatewayEvent,
        why: &str,
    ) -> Result<ReconcileOutcome, CoreError> {
        tracing::warn!(
            %shipment_id,
            event_id = event.id,
            event_type = %event.event_type,
            why,
            "webhook event dropped"
        );
        Ok(ReconcileOutcome::Dropped)
    }
}

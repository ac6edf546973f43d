use chrono::Utc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use transport_payments::error::CoreError;
use transport_payments::domain::payment::{PaymentRecord, PaymentState, INTENT_SUCCEEDED};
use transport_payments::domain::ports::PaymentLedger;
use transport_payments::repo::in_memory::InMemoryLedger;
use transport_payments::service::reconciler::{ReconcileOutcome, WebhookReconciler};
use transport_payments::webhook::event::{EventData, GatewayEvent};
use uuid::Uuid;

fn reconciler() -> (WebhookReconciler, Arc<InMemoryLedger>) {
    let ledger = Arc::new(InMemoryLedger::new());
    (
        WebhookReconciler {
            ledger: ledger.clone(),
        },
        ledger,
    )
}

async fn seed(
    ledger: &InMemoryLedger,
    state: PaymentState,
    deposit_captured: bool,
    final_captured: bool,
) -> PaymentRecord {
    let mut record = PaymentRecord::new(Uuid::new_v4(), 30_000, "USD");
    record.state = state;
    record.deposit_intent_id = Some("pi_dep".to_string());
    if state != PaymentState::New {
        if deposit_captured {
            record.deposit_status = Some(INTENT_SUCCEEDED.to_string());
        }
        if matches!(
            state,
            PaymentState::FinalPending
                | PaymentState::FinalCaptured
                | PaymentState::Settled
                | PaymentState::Refunded
                | PaymentState::PartiallyRefunded
        ) {
            record.final_intent_id = Some("pi_fin".to_string());
        }
        if final_captured {
            record.final_status = Some(INTENT_SUCCEEDED.to_string());
        }
    }
    assert!(ledger.insert(&record).await.unwrap());
    record
}

fn event(id: i64, event_type: &str, shipment_id: Uuid, intent_id: &str, amount: Option<i64>) -> GatewayEvent {
    GatewayEvent {
        id,
        event_type: event_type.to_string(),
        data: EventData {
            intent_id: intent_id.to_string(),
            shipment_id,
            amount_minor: amount,
        },
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn deposit_capture_event_applies() {
    let (reconciler, ledger) = reconciler();
    let record = seed(&ledger, PaymentState::DepositPending, false, false).await;

    let e = event(5, "payment_intent.succeeded", record.shipment_id, "pi_dep", None);
    assert_eq!(reconciler.apply(&e).await.unwrap(), ReconcileOutcome::Applied);

    let stored = ledger.find(record.shipment_id).await.unwrap().unwrap();
    assert_eq!(stored.state, PaymentState::DepositCaptured);
    assert_eq!(stored.last_event_id, 5);
    assert!(stored.deposit_captured());
}

#[tokio::test]
async fn replaying_the_same_event_changes_nothing() {
    let (reconciler, ledger) = reconciler();
    let record = seed(&ledger, PaymentState::DepositPending, false, false).await;

    let e = event(5, "payment_intent.succeeded", record.shipment_id, "pi_dep", None);
    assert_eq!(reconciler.apply(&e).await.unwrap(), ReconcileOutcome::Applied);
    let after_first = ledger.find(record.shipment_id).await.unwrap().unwrap();

    assert_eq!(reconciler.apply(&e).await.unwrap(), ReconcileOutcome::Stale);
    let after_second = ledger.find(record.shipment_id).await.unwrap().unwrap();
    assert_eq!(after_first, after_second);
}

#[tokio::test]
async fn older_event_ids_are_absorbed() {
    let (reconciler, ledger) = reconciler();
    let record = seed(&ledger, PaymentState::DepositPending, false, false).await;

    let newer = event(10, "payment_intent.succeeded", record.shipment_id, "pi_dep", None);
    assert_eq!(reconciler.apply(&newer).await.unwrap(), ReconcileOutcome::Applied);

    let older = event(3, "payment_intent.payment_failed", record.shipment_id, "pi_dep", None);
    assert_eq!(reconciler.apply(&older).await.unwrap(), ReconcileOutcome::Stale);

    let stored = ledger.find(record.shipment_id).await.unwrap().unwrap();
    assert_eq!(stored.state, PaymentState::DepositCaptured);
    assert_eq!(stored.last_event_id, 10);
}

#[tokio::test]
async fn invalid_edge_is_dropped_without_consuming_the_id() {
    let (reconciler, ledger) = reconciler();
    let record = seed(&ledger, PaymentState::Settled, true, true).await;

    // A cancellation cannot follow settlement.
    let bad = event(7, "payment_intent.canceled", record.shipment_id, "pi_dep", None);
    assert_eq!(reconciler.apply(&bad).await.unwrap(), ReconcileOutcome::Dropped);

    let stored = ledger.find(record.shipment_id).await.unwrap().unwrap();
    assert_eq!(stored.state, PaymentState::Settled);
    assert_eq!(stored.last_event_id, 0);

    // A later correct event with the same id range still lands.
    let refund = event(7, "charge.refunded", record.shipment_id, "pi_fin", Some(30_000));
    assert_eq!(reconciler.apply(&refund).await.unwrap(), ReconcileOutcome::Applied);
    let stored = ledger.find(record.shipment_id).await.unwrap().unwrap();
    assert_eq!(stored.state, PaymentState::Refunded);
}

#[tokio::test]
async fn failed_attempt_keeps_the_state_machine_in_place() {
    let (reconciler, ledger) = reconciler();
    let record = seed(&ledger, PaymentState::DepositPending, false, false).await;

    let e = event(4, "payment_intent.payment_failed", record.shipment_id, "pi_dep", None);
    assert_eq!(reconciler.apply(&e).await.unwrap(), ReconcileOutcome::Applied);

    let stored = ledger.find(record.shipment_id).await.unwrap().unwrap();
    assert_eq!(stored.state, PaymentState::DepositPending);
    assert_eq!(stored.deposit_status.as_deref(), Some("failed"));
    assert_eq!(stored.last_event_id, 4);
}

#[tokio::test]
async fn final_capture_event_settles_the_record() {
    let (reconciler, ledger) = reconciler();
    let record = seed(&ledger, PaymentState::FinalPending, true, false).await;

    let e = event(9, "payment_intent.succeeded", record.shipment_id, "pi_fin", None);
    assert_eq!(reconciler.apply(&e).await.unwrap(), ReconcileOutcome::Applied);

    let stored = ledger.find(record.shipment_id).await.unwrap().unwrap();
    assert_eq!(stored.state, PaymentState::Settled);
    assert!(stored.final_captured());
}

#[tokio::test]
async fn webhook_converges_after_synchronous_capture() {
    let (reconciler, ledger) = reconciler();
    // The coordinator already captured the deposit; the webhook for the same
    // capture arrives afterwards.
    let record = seed(&ledger, PaymentState::DepositCaptured, true, false).await;

    let e = event(6, "payment_intent.succeeded", record.shipment_id, "pi_dep", None);
    assert_eq!(reconciler.apply(&e).await.unwrap(), ReconcileOutcome::Applied);

    let stored = ledger.find(record.shipment_id).await.unwrap().unwrap();
    assert_eq!(stored.state, PaymentState::DepositCaptured);
    assert_eq!(stored.last_event_id, 6);
}

#[tokio::test]
async fn refund_events_carry_cumulative_totals() {
    let (reconciler, ledger) = reconciler();
    let record = seed(&ledger, PaymentState::Settled, true, true).await;

    let first = event(11, "charge.refunded", record.shipment_id, "pi_fin", Some(10_000));
    assert_eq!(reconciler.apply(&first).await.unwrap(), ReconcileOutcome::Applied);
    let stored = ledger.find(record.shipment_id).await.unwrap().unwrap();
    assert_eq!(stored.state, PaymentState::PartiallyRefunded);
    assert_eq!(stored.refunded_amount, 10_000);

    let second = event(12, "charge.refunded", record.shipment_id, "pi_fin", Some(30_000));
    assert_eq!(reconciler.apply(&second).await.unwrap(), ReconcileOutcome::Applied);
    let stored = ledger.find(record.shipment_id).await.unwrap().unwrap();
    assert_eq!(stored.state, PaymentState::Refunded);
    assert_eq!(stored.refunded_amount, 30_000);
}

#[tokio::test]
async fn refund_echo_after_a_partial_sync_refund_only_advances_the_cursor() {
    let (reconciler, ledger) = reconciler();
    // The coordinator already recorded a 2000-cent refund of the captured
    // deposit; the gateway's echo of that refund arrives afterwards.
    let mut record = seed(&ledger, PaymentState::DepositCaptured, true, false).await;
    record.refunded_amount = 2_000;
    record.state = PaymentState::PartiallyRefunded;
    assert!(ledger.update(&record, record.version).await.unwrap());

    let e = event(8, "charge.refunded", record.shipment_id, "pi_dep", Some(2_000));
    assert_eq!(reconciler.apply(&e).await.unwrap(), ReconcileOutcome::Applied);

    let stored = ledger.find(record.shipment_id).await.unwrap().unwrap();
    assert_eq!(stored.refunded_amount, 2_000);
    assert_eq!(stored.state, PaymentState::PartiallyRefunded);
    assert_eq!(stored.last_event_id, 8);
}

#[tokio::test]
async fn refund_echo_after_a_full_sync_refund_only_advances_the_cursor() {
    let (reconciler, ledger) = reconciler();
    let mut record = seed(&ledger, PaymentState::DepositCaptured, true, false).await;
    record.refunded_amount = 6_000;
    record.state = PaymentState::Refunded;
    assert!(ledger.update(&record, record.version).await.unwrap());

    let e = event(9, "charge.refunded", record.shipment_id, "pi_dep", Some(6_000));
    assert_eq!(reconciler.apply(&e).await.unwrap(), ReconcileOutcome::Applied);

    let stored = ledger.find(record.shipment_id).await.unwrap().unwrap();
    assert_eq!(stored.refunded_amount, 6_000);
    assert_eq!(stored.state, PaymentState::Refunded);
    assert_eq!(stored.last_event_id, 9);
}

#[tokio::test]
async fn refund_beyond_captured_is_dropped() {
    let (reconciler, ledger) = reconciler();
    let record = seed(&ledger, PaymentState::DepositCaptured, true, false).await;

    let e = event(3, "charge.refunded", record.shipment_id, "pi_dep", Some(30_000));
    assert_eq!(reconciler.apply(&e).await.unwrap(), ReconcileOutcome::Dropped);
    let stored = ledger.find(record.shipment_id).await.unwrap().unwrap();
    assert_eq!(stored.refunded_amount, 0);
}

#[tokio::test]
async fn unknown_shipment_is_reported_not_fatal() {
    let (reconciler, _ledger) = reconciler();
    let e = event(1, "payment_intent.succeeded", Uuid::new_v4(), "pi_x", None);
    assert_eq!(
        reconciler.apply(&e).await.unwrap(),
        ReconcileOutcome::UnknownShipment
    );
}

/// Delegates to an in-memory ledger but, for each remaining scripted
/// conflict, lets a competing writer bump the row version right before the
/// caller's compare-and-set.
struct ContendedLedger {
    inner: InMemoryLedger,
    remaining_conflicts: AtomicU32,
}

#[async_trait::async_trait]
impl PaymentLedger for ContendedLedger {
    async fn find(&self, shipment_id: Uuid) -> Result<Option<PaymentRecord>, CoreError> {
        self.inner.find(shipment_id).await
    }

    async fn insert(&self, record: &PaymentRecord) -> Result<bool, CoreError> {
        self.inner.insert(record).await
    }

    async fn update(&self, record: &PaymentRecord, expected_version: i32) -> Result<bool, CoreError> {
        if self
            .remaining_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            let current = self
                .inner
                .find(record.shipment_id)
                .await?
                .expect("contended row exists");
            let version = current.version;
            assert!(self.inner.update(&current, version).await?);
        }
        self.inner.update(record, expected_version).await
    }
}

#[tokio::test]
async fn version_conflicts_are_retried_until_the_event_lands() {
    let inner = InMemoryLedger::new();
    let record = seed(&inner, PaymentState::DepositPending, false, false).await;

    let reconciler = WebhookReconciler {
        ledger: Arc::new(ContendedLedger {
            inner: inner.clone(),
            remaining_conflicts: AtomicU32::new(2),
        }),
    };

    let e = event(5, "payment_intent.succeeded", record.shipment_id, "pi_dep", None);
    assert_eq!(reconciler.apply(&e).await.unwrap(), ReconcileOutcome::Applied);

    let stored = inner.find(record.shipment_id).await.unwrap().unwrap();
    assert_eq!(stored.state, PaymentState::DepositCaptured);
    assert_eq!(stored.last_event_id, 5);
}

#[tokio::test]
async fn unmatched_intent_is_dropped() {
    let (reconciler, ledger) = reconciler();
    let record = seed(&ledger, PaymentState::DepositPending, false, false).await;

    let e = event(2, "payment_intent.succeeded", record.shipment_id, "pi_other", None);
    assert_eq!(reconciler.apply(&e).await.unwrap(), ReconcileOutcome::Dropped);
}

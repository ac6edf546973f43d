use crate::domain::payment::PaymentRecord;
use crate::domain::ports::{PaymentLedger, PricingConfigStore, ShipmentStatusSource};
use crate::domain::shipment::{ShipmentStatus, StatusEntry};
use crate::error::CoreError;
use crate::pricing::config::{ConfigChange, PricingConfig, PricingConfigPatch};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// In-memory ledger with the same compare-and-set contract as the Postgres
/// repo. Backs the integration tests and local runs without a database.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    rows: Arc<Mutex<HashMap<Uuid, PaymentRecord>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl PaymentLedger for InMemoryLedger {
    async fn find(&self, shipment_id: Uuid) -> Result<Option<PaymentRecord>, CoreError> {
        Ok(self.rows.lock().expect("ledger lock").get(&shipment_id).cloned())
    }

    async fn insert(&self, record: &PaymentRecord) -> Result<bool, CoreError> {
        let mut rows = self.rows.lock().expect("ledger lock");
        if rows.contains_key(&record.shipment_id) {
            return Ok(false);
        }
        rows.insert(record.shipment_id, record.clone());
        Ok(true)
    }

    async fn update(&self, record: &PaymentRecord, expected_version: i32) -> Result<bool, CoreError> {
        let mut rows = self.rows.lock().expect("ledger lock");
        match rows.get_mut(&record.shipment_id) {
            Some(stored) if stored.version == expected_version => {
                let mut next = record.clone();
                next.version = expected_version + 1;
                next.updated_at = Utc::now();
                *stored = next;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(CoreError::validation(format!(
                "no payment record for shipment {}",
                record.shipment_id
            ))),
        }
    }
}

#[derive(Clone)]
pub struct InMemoryConfigStore {
    active: Arc<Mutex<PricingConfig>>,
    history: Arc<Mutex<Vec<ConfigChange>>>,
}

impl InMemoryConfigStore {
    pub fn new(config: PricingConfig) -> Self {
        InMemoryConfigStore {
            active: Arc::new(Mutex::new(config)),
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Default for InMemoryConfigStore {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}

#[async_trait::async_trait]
impl PricingConfigStore for InMemoryConfigStore {
    async fn get_active(&self) -> Result<PricingConfig, CoreError> {
        Ok(self.active.lock().expect("config lock").clone())
    }

    async fn update(
        &self,
        patch: PricingConfigPatch,
        reason: &str,
        actor: &str,
    ) -> Result<PricingConfig, CoreError> {
        let mut active = self.active.lock().expect("config lock");
        let next = active.apply(&patch);
        next.validate()?;
        self.history.lock().expect("config history lock").push(ConfigChange {
            old: active.clone(),
            new: next.clone(),
            reason: reason.to_string(),
            actor: actor.to_string(),
            changed_at: Utc::now(),
        });
        *active = next.clone();
        Ok(next)
    }

    async fn history(&self) -> Result<Vec<ConfigChange>, CoreError> {
        Ok(self.history.lock().expect("config history lock").clone())
    }
}

/// Scripted shipment lifecycle for tests: push statuses, the coordinator and
/// evaluator read them back.
#[derive(Clone, Default)]
pub struct InMemoryShipments {
    histories: Arc<Mutex<HashMap<Uuid, Vec<StatusEntry>>>>,
}

impl InMemoryShipments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_status(&self, shipment_id: Uuid, status: ShipmentStatus) {
        self.histories
            .lock()
            .expect("shipments lock")
            .entry(shipment_id)
            .or_default()
            .push(StatusEntry {
                status,
                at: Utc::now(),
            });
    }
}

#[async_trait::async_trait]
impl ShipmentStatusSource for InMemoryShipments {
    async fn current_status(&self, shipment_id: Uuid) -> Result<ShipmentStatus, CoreError> {
        self.histories
            .lock()
            .expect("shipments lock")
            .get(&shipment_id)
            .and_then(|h| h.last().map(|e| e.status))
            .ok_or_else(|| CoreError::validation(format!("unknown shipment {shipment_id}")))
    }

    async fn status_history(&self, shipment_id: Uuid) -> Result<Vec<StatusEntry>, CoreError> {
        Ok(self
            .histories
            .lock()
            .expect("shipments lock")
            .get(&shipment_id)
            .cloned()
            .unwrap_or_default())
    }
}

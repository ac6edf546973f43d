use crate::domain::payment::PaymentRecord;
use crate::domain::shipment::{ShipmentStatus, StatusEntry};
use crate::error::CoreError;
use crate::pricing::config::{ConfigChange, PricingConfig, PricingConfigPatch};
use uuid::Uuid;

/// Authoritative per-shipment payment rows. Both the coordinator and the
/// reconciler write through this; `update` is a compare-and-set on the
/// version column, which is what serializes the two writers.
#[async_trait::async_trait]
pub trait PaymentLedger: Send + Sync {
    async fn find(&self, shipment_id: Uuid) -> Result<Option<PaymentRecord>, CoreError>;

    /// Insert a brand-new row. Returns false if a row for this shipment
    /// already exists (a concurrent creator won the race).
    async fn insert(&self, record: &PaymentRecord) -> Result<bool, CoreError>;

    /// Persist `record` only if the stored version still equals
    /// `expected_version`; bumps the version on success. Returns false on a
    /// version conflict so the caller can reload and retry.
    async fn update(&self, record: &PaymentRecord, expected_version: i32) -> Result<bool, CoreError>;
}

/// One active tariff row; every mutation appends to an immutable history.
#[async_trait::async_trait]
pub trait PricingConfigStore: Send + Sync {
    async fn get_active(&self) -> Result<PricingConfig, CoreError>;

    async fn update(
        &self,
        patch: PricingConfigPatch,
        reason: &str,
        actor: &str,
    ) -> Result<PricingConfig, CoreError>;

    async fn history(&self) -> Result<Vec<ConfigChange>, CoreError>;
}

/// Read-only view of the external shipment lifecycle service. This core
/// never mutates shipment status.
#[async_trait::async_trait]
pub trait ShipmentStatusSource: Send + Sync {
    async fn current_status(&self, shipment_id: Uuid) -> Result<ShipmentStatus, CoreError>;

    async fn status_history(&self, shipment_id: Uuid) -> Result<Vec<StatusEntry>, CoreError>;
}

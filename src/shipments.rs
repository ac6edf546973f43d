use crate::domain::ports::ShipmentStatusSource;
use crate::domain::shipment::{ShipmentStatus, StatusEntry};
use crate::error::CoreError;
use serde::Deserialize;
use uuid::Uuid;

/// Read-only HTTP client for the shipment lifecycle service.
pub struct HttpShipmentService {
    pub base_url: String,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: ShipmentStatus,
    history: Vec<StatusEntry>,
}

impl HttpShipmentService {
    async fn fetch(&self, shipment_id: Uuid) -> Result<StatusResponse, CoreError> {
        let resp = self
            .client
            .get(format!("{}/shipments/{}/status", self.base_url, shipment_id))
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(|e| CoreError::gateway_transient(format!("shipment service: {e}")))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CoreError::validation(format!("unknown shipment {shipment_id}")));
        }
        if !resp.status().is_success() {
            return Err(CoreError::gateway_transient(format!(
                "shipment service HTTP {}",
                resp.status().as_u16()
            )));
        }

        resp.json()
            .await
            .map_err(|e| CoreError::gateway_transient(format!("shipment service body: {e}")))
    }
}

#[async_trait::async_trait]
impl ShipmentStatusSource for HttpShipmentService {
    async fn current_status(&self, shipment_id: Uuid) -> Result<ShipmentStatus, CoreError> {
        Ok(self.fetch(shipment_id).await?.status)
    }

    async fn status_history(&self, shipment_id: Uuid) -> Result<Vec<StatusEntry>, CoreError> {
        Ok(self.fetch(shipment_id).await?.history)
    }
}

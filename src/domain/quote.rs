use crate::error::CoreError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    Sedan,
    Suv,
    Pickup,
    Van,
    Motorcycle,
    HeavyEquipment,
}

impl VehicleType {
    pub fn parse(s: &str) -> Result<VehicleType, CoreError> {
        Ok(match s {
            "sedan" => VehicleType::Sedan,
            "suv" => VehicleType::Suv,
            "pickup" => VehicleType::Pickup,
            "van" => VehicleType::Van,
            "motorcycle" => VehicleType::Motorcycle,
            "heavy_equipment" => VehicleType::HeavyEquipment,
            other => {
                return Err(CoreError::validation(format!(
                    "unknown vehicle type: {other}"
                )))
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceLevel {
    Expedited,
    Standard,
    Flexible,
}

/// Everything the calculator needs for one quote. Dates are calendar dates;
/// the 7-day window that separates standard from flexible is date arithmetic,
/// not wall-clock.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteInput {
    pub distance_miles: f64,
    pub vehicle_type: String,
    pub pickup_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub accident_recovery: bool,
}

/// Priced result with the full breakdown kept for audit. `total_cents` is the
/// only field that feeds the payment split.
#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub distance_miles: f64,
    pub vehicle_type: VehicleType,
    pub service_level: ServiceLevel,
    pub raw_base: f64,
    pub applied_multiplier: f64,
    pub fuel_adjustment_pct: f64,
    pub surge_applied: bool,
    pub minimum_applied: bool,
    pub total_cents: i64,
}

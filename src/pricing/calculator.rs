use crate::domain::quote::{Quote, QuoteInput, ServiceLevel, VehicleType};
use crate::error::CoreError;
use crate::pricing::bands::{per_mile_rate, resolve_band};
use crate::pricing::config::PricingConfig;
use chrono::{NaiveDate, Utc};

/// Deterministic pricing pipeline. Step order is fixed: base rate, service
/// multiplier, fuel adjustment, surge, minimum floor, then a single half-up
/// rounding to cents at the end. Reordering any of these changes totals.
pub fn calculate_quote(input: &QuoteInput, cfg: &PricingConfig) -> Result<Quote, CoreError> {
    let vehicle_type = VehicleType::parse(&input.vehicle_type)?;
    let band = resolve_band(input.distance_miles, cfg)?;

    // Short hauls are billed as if they were min_miles long; the band still
    // comes from the actual distance.
    let billable_miles = input.distance_miles.max(cfg.min_miles);
    let raw_base = per_mile_rate(band, cfg) * billable_miles;

    let service_level = effective_service_level(input.pickup_date, input.delivery_date, cfg);
    let applied_multiplier = match service_level {
        ServiceLevel::Expedited => cfg.expedited_multiplier,
        ServiceLevel::Standard => cfg.standard_multiplier,
        ServiceLevel::Flexible => cfg.flexible_multiplier,
    };
    let mut price = raw_base * applied_multiplier;

    let fuel_adjustment_pct =
        (cfg.current_fuel_price - cfg.base_fuel_price) * cfg.fuel_adjustment_per_dollar;
    price *= 1.0 + fuel_adjustment_pct / 100.0;

    let surge_applied = cfg.surge_enabled;
    if surge_applied {
        price *= cfg.surge_multiplier;
    }

    let floor_cents = if input.accident_recovery {
        cfg.accident_min_quote_cents
    } else {
        cfg.min_quote_cents
    };
    let floor = floor_cents as f64 / 100.0;
    let minimum_applied = price < floor;
    if minimum_applied {
        price = floor;
    }

    Ok(Quote {
        distance_miles: input.distance_miles,
        vehicle_type,
        service_level,
        raw_base,
        applied_multiplier,
        fuel_adjustment_pct,
        surge_applied,
        minimum_applied,
        total_cents: to_cents(price),
    })
}

/// No delivery date means the customer wants it moved now. A window wider
/// than seven days earns the flexible rate. Disabled levels fall back to
/// standard rather than erroring.
fn effective_service_level(
    pickup: Option<NaiveDate>,
    delivery: Option<NaiveDate>,
    cfg: &PricingConfig,
) -> ServiceLevel {
    let requested = match delivery {
        None => ServiceLevel::Expedited,
        Some(delivery_date) => {
            let pickup_date = pickup.unwrap_or_else(|| Utc::now().date_naive());
            if (delivery_date - pickup_date).num_days() > 7 {
                ServiceLevel::Flexible
            } else {
                ServiceLevel::Standard
            }
        }
    };
    match requested {
        ServiceLevel::Expedited if !cfg.expedited_enabled => ServiceLevel::Standard,
        ServiceLevel::Flexible if !cfg.flexible_enabled => ServiceLevel::Standard,
        other => other,
    }
}

/// Half-up rounding to integer cents; the only rounding in the pipeline.
fn to_cents(dollars: f64) -> i64 {
    (dollars * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn flat_fuel() -> PricingConfig {
        // base == current, so no fuel adjustment
        PricingConfig::default()
    }

    fn input(distance: f64) -> QuoteInput {
        QuoteInput {
            distance_miles: distance,
            vehicle_type: "sedan".to_string(),
            pickup_date: Some(NaiveDate::from_ymd_opt(2026, 9, 1).unwrap()),
            delivery_date: Some(NaiveDate::from_ymd_opt(2026, 9, 4).unwrap()),
            accident_recovery: false,
        }
    }

    #[test]
    fn standard_300_miles_at_short_rate() {
        let quote = calculate_quote(&input(300.0), &flat_fuel()).unwrap();
        assert_eq!(quote.service_level, ServiceLevel::Standard);
        assert_eq!(quote.total_cents, 30_000);
        assert!(!quote.minimum_applied);
        assert!(!quote.surge_applied);
    }

    #[test]
    fn short_haul_floors_to_min_quote() {
        // 50 billable-as-100 miles at $1/mi is $100, under the $150 floor
        let quote = calculate_quote(&input(50.0), &flat_fuel()).unwrap();
        assert_eq!(quote.total_cents, 15_000);
        assert!(quote.minimum_applied);
    }

    #[test]
    fn missing_delivery_date_prices_expedited() {
        let mut req = input(300.0);
        req.delivery_date = None;
        let quote = calculate_quote(&req, &flat_fuel()).unwrap();
        assert_eq!(quote.service_level, ServiceLevel::Expedited);
        assert_eq!(quote.applied_multiplier, 1.25);
        assert_eq!(quote.total_cents, 37_500);
    }

    #[test]
    fn wide_window_prices_flexible() {
        let mut req = input(300.0);
        req.delivery_date = Some(NaiveDate::from_ymd_opt(2026, 9, 15).unwrap());
        let quote = calculate_quote(&req, &flat_fuel()).unwrap();
        assert_eq!(quote.service_level, ServiceLevel::Flexible);
    }

    #[test]
    fn exactly_seven_days_is_still_standard() {
        let mut req = input(300.0);
        req.delivery_date = Some(NaiveDate::from_ymd_opt(2026, 9, 8).unwrap());
        let quote = calculate_quote(&req, &flat_fuel()).unwrap();
        assert_eq!(quote.service_level, ServiceLevel::Standard);
    }

    #[test]
    fn disabled_expedited_falls_back_to_standard() {
        let cfg = PricingConfig {
            expedited_enabled: false,
            ..flat_fuel()
        };
        let mut req = input(300.0);
        req.delivery_date = None;
        let quote = calculate_quote(&req, &cfg).unwrap();
        assert_eq!(quote.service_level, ServiceLevel::Standard);
        assert_eq!(quote.total_cents, 30_000);
    }

    #[test]
    fn fuel_surcharge_applies_per_dollar_delta() {
        let cfg = PricingConfig {
            current_fuel_price: 4.50, // +$1.00 at 2%/dollar -> +2%
            ..flat_fuel()
        };
        let quote = calculate_quote(&input(300.0), &cfg).unwrap();
        assert_eq!(quote.fuel_adjustment_pct, 2.0);
        assert_eq!(quote.total_cents, 30_600);
    }

    #[test]
    fn cheaper_fuel_discounts_without_clamping() {
        let cfg = PricingConfig {
            current_fuel_price: 2.50, // -$1.00 -> -2%
            ..flat_fuel()
        };
        let quote = calculate_quote(&input(300.0), &cfg).unwrap();
        assert_eq!(quote.total_cents, 29_400);
    }

    #[test]
    fn surge_multiplies_last_before_floor() {
        let cfg = PricingConfig {
            surge_enabled: true,
            ..flat_fuel()
        };
        let quote = calculate_quote(&input(300.0), &cfg).unwrap();
        assert!(quote.surge_applied);
        assert_eq!(quote.total_cents, 34_500);
    }

    #[test]
    fn accident_recovery_uses_its_own_floor() {
        let mut req = input(50.0);
        req.accident_recovery = true;
        let quote = calculate_quote(&req, &flat_fuel()).unwrap();
        assert_eq!(quote.total_cents, 25_000);
        assert!(quote.minimum_applied);
    }

    #[test]
    fn non_positive_distance_is_rejected() {
        let err = calculate_quote(&input(0.0), &flat_fuel()).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        let err = calculate_quote(&input(-5.0), &flat_fuel()).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn unknown_vehicle_type_is_rejected() {
        let mut req = input(300.0);
        req.vehicle_type = "hovercraft".to_string();
        let err = calculate_quote(&req, &flat_fuel()).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn fractional_cents_round_once_at_the_end() {
        // $300.004 -> 30000, $300.006 -> 30001
        let quote = calculate_quote(&input(300.004), &flat_fuel()).unwrap();
        assert_eq!(quote.total_cents, 30_000);
        let quote = calculate_quote(&input(300.006), &flat_fuel()).unwrap();
        assert_eq!(quote.total_cents, 30_001);
    }
}

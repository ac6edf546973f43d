use crate::error::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Versioned tariff parameters. Money fields are integer cents; per-mile
/// rates and fuel prices are dollars. Exactly one active row exists at a
/// time and is only read through `PricingConfigStore::get_active`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    pub min_quote_cents: i64,
    pub accident_min_quote_cents: i64,
    pub min_miles: f64,
    pub short_distance_max: f64,
    pub mid_distance_max: f64,
    pub short_rate_per_mile: f64,
    pub mid_rate_per_mile: f64,
    pub long_rate_per_mile: f64,
    pub base_fuel_price: f64,
    pub current_fuel_price: f64,
    pub fuel_adjustment_per_dollar: f64,
    pub surge_enabled: bool,
    pub surge_multiplier: f64,
    pub expedited_multiplier: f64,
    pub standard_multiplier: f64,
    pub flexible_multiplier: f64,
    pub expedited_enabled: bool,
    pub standard_enabled: bool,
    pub flexible_enabled: bool,
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig {
            min_quote_cents: 15_000,
            accident_min_quote_cents: 25_000,
            min_miles: 100.0,
            short_distance_max: 500.0,
            mid_distance_max: 1500.0,
            short_rate_per_mile: 1.00,
            mid_rate_per_mile: 0.80,
            long_rate_per_mile: 0.60,
            base_fuel_price: 3.50,
            current_fuel_price: 3.50,
            fuel_adjustment_per_dollar: 2.0,
            surge_enabled: false,
            surge_multiplier: 1.15,
            expedited_multiplier: 1.25,
            standard_multiplier: 1.0,
            flexible_multiplier: 0.95,
            expedited_enabled: true,
            standard_enabled: true,
            flexible_enabled: true,
        }
    }
}

impl PricingConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.min_quote_cents < 0 || self.accident_min_quote_cents < 0 {
            return Err(CoreError::validation("minimum quotes must be >= 0"));
        }
        if self.min_miles < 0.0 {
            return Err(CoreError::validation("min_miles must be >= 0"));
        }
        if self.short_distance_max <= 0.0 || self.mid_distance_max <= self.short_distance_max {
            return Err(CoreError::validation(
                "band thresholds must satisfy 0 < short_distance_max < mid_distance_max",
            ));
        }
        for (name, rate) in [
            ("short_rate_per_mile", self.short_rate_per_mile),
            ("mid_rate_per_mile", self.mid_rate_per_mile),
            ("long_rate_per_mile", self.long_rate_per_mile),
        ] {
            if rate <= 0.0 {
                return Err(CoreError::validation(format!("{name} must be > 0")));
            }
        }
        for (name, m) in [
            ("surge_multiplier", self.surge_multiplier),
            ("expedited_multiplier", self.expedited_multiplier),
            ("standard_multiplier", self.standard_multiplier),
            ("flexible_multiplier", self.flexible_multiplier),
        ] {
            if m <= 0.0 {
                return Err(CoreError::validation(format!("{name} must be > 0")));
            }
        }
        Ok(())
    }

    pub fn apply(&self, patch: &PricingConfigPatch) -> PricingConfig {
        let mut next = self.clone();
        macro_rules! take {
            ($field:ident) => {
                if let Some(v) = patch.$field {
                    next.$field = v;
                }
            };
        }
        take!(min_quote_cents);
        take!(accident_min_quote_cents);
        take!(min_miles);
        take!(short_distance_max);
        take!(mid_distance_max);
        take!(short_rate_per_mile);
        take!(mid_rate_per_mile);
        take!(long_rate_per_mile);
        take!(base_fuel_price);
        take!(current_fuel_price);
        take!(fuel_adjustment_per_dollar);
        take!(surge_enabled);
        take!(surge_multiplier);
        take!(expedited_multiplier);
        take!(standard_multiplier);
        take!(flexible_multiplier);
        take!(expedited_enabled);
        take!(standard_enabled);
        take!(flexible_enabled);
        next
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PricingConfigPatch {
    pub min_quote_cents: Option<i64>,
    pub accident_min_quote_cents: Option<i64>,
    pub min_miles: Option<f64>,
    pub short_distance_max: Option<f64>,
    pub mid_distance_max: Option<f64>,
    pub short_rate_per_mile: Option<f64>,
    pub mid_rate_per_mile: Option<f64>,
    pub long_rate_per_mile: Option<f64>,
    pub base_fuel_price: Option<f64>,
    pub current_fuel_price: Option<f64>,
    pub fuel_adjustment_per_dollar: Option<f64>,
    pub surge_enabled: Option<bool>,
    pub surge_multiplier: Option<f64>,
    pub expedited_multiplier: Option<f64>,
    pub standard_multiplier: Option<f64>,
    pub flexible_multiplier: Option<f64>,
    pub expedited_enabled: Option<bool>,
    pub standard_enabled: Option<bool>,
    pub flexible_enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigChange {
    pub old: PricingConfig,
    pub new: PricingConfig,
    pub reason: String,
    pub actor: String,
    pub changed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        PricingConfig::default().validate().expect("default config");
    }

    #[test]
    fn zero_multiplier_is_rejected() {
        let cfg = PricingConfig {
            standard_multiplier: 0.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn patch_touches_only_named_fields() {
        let base = PricingConfig::default();
        let patched = base.apply(&PricingConfigPatch {
            surge_enabled: Some(true),
            current_fuel_price: Some(4.50),
            ..Default::default()
        });
        assert!(patched.surge_enabled);
        assert_eq!(patched.current_fuel_price, 4.50);
        assert_eq!(patched.min_quote_cents, base.min_quote_cents);
        assert_eq!(patched.short_rate_per_mile, base.short_rate_per_mile);
    }
}

use crate::error::CoreError;
use crate::pricing::config::PricingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceBand {
    Short,
    Mid,
    Long,
}

pub fn resolve_band(distance_miles: f64, cfg: &PricingConfig) -> Result<DistanceBand, CoreError> {
    if !distance_miles.is_finite() || distance_miles <= 0.0 {
        return Err(CoreError::validation("distance_miles must be > 0"));
    }
    Ok(if distance_miles <= cfg.short_distance_max {
        DistanceBand::Short
    } else if distance_miles <= cfg.mid_distance_max {
        DistanceBand::Mid
    } else {
        DistanceBand::Long
    })
}

pub fn per_mile_rate(band: DistanceBand, cfg: &PricingConfig) -> f64 {
    match band {
        DistanceBand::Short => cfg.short_rate_per_mile,
        DistanceBand::Mid => cfg.mid_rate_per_mile,
        DistanceBand::Long => cfg.long_rate_per_mile,
    }
}

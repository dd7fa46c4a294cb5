//! Pricing configuration loading.
//!
//! The default pricing is a TOML file embedded at compile time. Operators
//! can supply their own file through [`load_pricing`].

use taxi_zones_fare_models::PricingConfig;

use crate::FareError;

const DEFAULT_PRICING_TOML: &str = include_str!("../pricing.toml");

/// Returns the embedded default pricing.
///
/// # Panics
///
/// Panics if the embedded TOML fails to parse or validate. It is a
/// compile-time constant, so a failure is a development error caught by
/// the tests below.
#[must_use]
pub fn default_pricing() -> PricingConfig {
    load_pricing(DEFAULT_PRICING_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse embedded pricing.toml: {e}"))
}

/// Parses and validates a pricing TOML document.
///
/// # Errors
///
/// * [`FareError::Config`] if the TOML does not deserialize
/// * [`FareError::InvalidConfig`] if a rate or multiplier is negative,
///   non-finite, or a peak window is empty
pub fn load_pricing(toml_str: &str) -> Result<PricingConfig, FareError> {
    let config: PricingConfig = toml::de::from_str(toml_str)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &PricingConfig) -> Result<(), FareError> {
    let non_negative = |value: f64| value.is_finite() && value >= 0.0;
    let positive = |value: f64| value.is_finite() && value > 0.0;

    if !non_negative(config.minimum_fare) {
        return Err(invalid(format!("minimum_fare {}", config.minimum_fare)));
    }
    if !positive(config.peak_multiplier) || !positive(config.cross_zone_surcharge) {
        return Err(invalid("multipliers must be positive".to_string()));
    }
    if !positive(config.fallback_speed_kmh) {
        return Err(invalid(format!(
            "fallback_speed_kmh {}",
            config.fallback_speed_kmh
        )));
    }
    if let Some(window) = config
        .peak_windows
        .iter()
        .find(|w| w.start_hour >= w.end_hour || w.end_hour > 24)
    {
        return Err(invalid(format!(
            "peak window {}..{}",
            window.start_hour, window.end_hour
        )));
    }
    for (vehicle, rates) in &config.vehicles {
        if ![rates.base_fare, rates.per_km_rate, rates.per_minute_rate]
            .into_iter()
            .all(non_negative)
        {
            return Err(invalid(format!("rates for vehicle type '{vehicle}'")));
        }
    }

    Ok(())
}

fn invalid(message: String) -> FareError {
    FareError::InvalidConfig { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_pricing_parses() {
        let config = default_pricing();
        assert!((config.peak_multiplier - 1.2).abs() < f64::EPSILON);
        assert!((config.cross_zone_surcharge - 1.1).abs() < f64::EPSILON);
        assert_eq!(config.peak_windows.len(), 2);
        assert!(config.vehicles.contains_key("standard"));
    }

    #[test]
    fn rejects_negative_rates() {
        let toml_str = r"
            minimum_fare = 5.0
            peak_multiplier = 1.2
            cross_zone_surcharge = 1.1
            fallback_speed_kmh = 30.0
            peak_windows = []

            [vehicles.standard]
            base_fare = 3.0
            per_km_rate = -1.0
            per_minute_rate = 0.2
        ";
        assert!(matches!(
            load_pricing(toml_str),
            Err(FareError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn rejects_inverted_peak_window() {
        let toml_str = r"
            minimum_fare = 5.0
            peak_multiplier = 1.2
            cross_zone_surcharge = 1.1
            fallback_speed_kmh = 30.0
            peak_windows = [{ start_hour = 9, end_hour = 7 }]

            [vehicles]
        ";
        assert!(matches!(
            load_pricing(toml_str),
            Err(FareError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            load_pricing("minimum_fare = "),
            Err(FareError::Config(_))
        ));
    }
}

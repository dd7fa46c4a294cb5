#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Fare rule, pricing configuration and fare quote types.
//!
//! Fare rules are owned by the admin side of the application and are
//! read-only here. Pricing configuration is deserialized from TOML.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use taxi_zones_zone_models::ZoneId;

/// A zone-scoped pricing adjustment for a set of vehicle types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FareRule {
    /// Rule identifier.
    pub id: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Added to the vehicle's base fare.
    #[serde(default)]
    pub base_fare_adjustment: f64,
    /// Added to the vehicle's per-km rate.
    #[serde(default)]
    pub per_km_adjustment: f64,
    /// Zones the rule applies to (pickup must be inside one of them).
    pub zone_ids: Vec<ZoneId>,
    /// Vehicle/service types the rule applies to.
    pub vehicle_types: Vec<String>,
    /// Inactive rules never match.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl FareRule {
    /// Returns `true` if the rule lists the vehicle type.
    #[must_use]
    pub fn covers_vehicle(&self, vehicle_type: &str) -> bool {
        self.vehicle_types.iter().any(|v| v == vehicle_type)
    }
}

const fn default_true() -> bool {
    true
}

/// Base rates for one vehicle/service type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleRates {
    /// Flat fare charged per trip.
    pub base_fare: f64,
    /// Charge per kilometer.
    pub per_km_rate: f64,
    /// Charge per minute.
    pub per_minute_rate: f64,
}

/// A daily peak window `[start_hour:00, end_hour:00)` in local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakWindow {
    /// First peak hour (inclusive).
    pub start_hour: u32,
    /// Hour the peak ends (exclusive).
    pub end_hour: u32,
}

impl PeakWindow {
    /// Returns `true` if the hour falls in this window.
    #[must_use]
    pub const fn contains_hour(&self, hour: u32) -> bool {
        hour >= self.start_hour && hour < self.end_hour
    }
}

/// Pricing parameters for fare calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Fares are never quoted below this amount.
    pub minimum_fare: f64,
    /// Multiplier applied during weekday peak windows.
    pub peak_multiplier: f64,
    /// Weekday (Mon–Fri) peak windows.
    pub peak_windows: Vec<PeakWindow>,
    /// Multiplier applied when pickup and dropoff are in different zones.
    pub cross_zone_surcharge: f64,
    /// Average speed used to estimate duration when no route is available.
    pub fallback_speed_kmh: f64,
    /// Rates keyed by vehicle/service type.
    pub vehicles: BTreeMap<String, VehicleRates>,
}

/// Distance and duration of a trip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripEstimate {
    /// Route distance in kilometers.
    pub distance_km: f64,
    /// Expected duration in minutes.
    pub duration_minutes: f64,
}

/// Outcome of matching a trip's endpoints against zones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneMatch {
    /// Zone containing the pickup point.
    pub pickup_zone: Option<ZoneId>,
    /// Zone containing the dropoff point.
    pub dropoff_zone: Option<ZoneId>,
    /// `true` when both endpoints are in zones and the zones differ.
    pub cross_zone: bool,
    /// Product of zone and cross-zone surcharges.
    pub multiplier: f64,
}

/// Itemized fare quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FareQuote {
    /// Requested vehicle/service type.
    pub vehicle_type: String,
    /// Trip distance and duration used.
    pub trip: TripEstimate,
    /// `true` if the trip estimate came from the straight-line fallback.
    pub estimated_trip: bool,
    /// Zone match result.
    pub zones: ZoneMatch,
    /// Fare rule whose adjustments were applied.
    pub applied_rule_id: Option<String>,
    /// Base fare after rule adjustment.
    pub base_fare: f64,
    /// Per-km rate after rule adjustment.
    pub per_km_rate: f64,
    /// Per-minute rate.
    pub per_minute_rate: f64,
    /// Peak multiplier (1.0 off-peak).
    pub peak_multiplier: f64,
    /// Fare before multipliers.
    pub subtotal: f64,
    /// Final fare, rounded to cents.
    pub total: f64,
    /// `true` if the minimum fare was charged.
    pub minimum_applied: bool,
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Fare-zone matching and fare calculation.
//!
//! The [`matcher`] finds which zones a trip starts and ends in and
//! composes their surcharges; the [`calculator`] turns a trip estimate,
//! vehicle rates, the matched fare rule and the peak/zone multipliers into
//! a [`FareQuote`](taxi_zones_fare_models::FareQuote). Zones are scanned
//! linearly in the order given; the first zone containing a point wins.

pub mod calculator;
pub mod matcher;
pub mod peak;
pub mod pricing;

use thiserror::Error;

pub use calculator::{FareCalculator, FareRequest, RouteDistance, StraightLineRouter};
pub use matcher::{applicable_rule, find_zone, match_zones};
pub use peak::{is_peak, peak_multiplier_at};
pub use pricing::{default_pricing, load_pricing};

/// Errors that can occur during fare operations.
#[derive(Debug, Error)]
pub enum FareError {
    /// No rates are configured for the requested vehicle type.
    #[error("Unknown vehicle type: {vehicle_type}")]
    UnknownVehicleType {
        /// The requested type.
        vehicle_type: String,
    },

    /// Pricing configuration could not be parsed.
    #[error("Pricing config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Pricing configuration parsed but is unusable.
    #[error("Invalid pricing config: {message}")]
    InvalidConfig {
        /// Description of what went wrong.
        message: String,
    },

    /// The routing collaborator failed.
    #[error("Routing error: {message}")]
    Routing {
        /// Description of what went wrong.
        message: String,
    },
}

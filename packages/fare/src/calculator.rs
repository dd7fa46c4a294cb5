//! Fare calculation.
//!
//! ```text
//! total = max(minimum_fare,
//!             (base + km × per_km + minutes × per_minute) × peak × zone)
//! ```
//!
//! `base` and `per_km` include the adjustments of the first applicable
//! fare rule. Trip distance comes from the routing collaborator behind
//! [`RouteDistance`]; if it fails the calculator falls back to the
//! great-circle distance and the configured average speed.

use chrono::NaiveDateTime;
use taxi_zones_fare_models::{FareQuote, FareRule, PricingConfig, TripEstimate};
use taxi_zones_geometry::{Coordinate, haversine_km, round_to};
use taxi_zones_zone_models::Zone;

use crate::FareError;
use crate::matcher::{applicable_rule, match_zones};
use crate::peak::peak_multiplier_at;

/// Routing collaborator returning driving distance and duration.
#[async_trait::async_trait]
pub trait RouteDistance: Send + Sync {
    /// Estimates the trip between two points.
    ///
    /// # Errors
    ///
    /// Returns [`FareError::Routing`] if no route is available.
    async fn route_distance(
        &self,
        pickup: Coordinate,
        dropoff: Coordinate,
    ) -> Result<TripEstimate, FareError>;
}

/// Router that answers with the great-circle distance at a fixed speed.
#[derive(Debug, Clone, Copy)]
pub struct StraightLineRouter {
    /// Average speed in km/h.
    pub speed_kmh: f64,
}

impl StraightLineRouter {
    /// Straight-line estimate between two points.
    #[must_use]
    pub fn estimate(&self, pickup: Coordinate, dropoff: Coordinate) -> TripEstimate {
        let distance_km = haversine_km(pickup, dropoff);
        let duration_minutes = if self.speed_kmh > 0.0 {
            distance_km / self.speed_kmh * 60.0
        } else {
            0.0
        };
        TripEstimate {
            distance_km,
            duration_minutes,
        }
    }
}

#[async_trait::async_trait]
impl RouteDistance for StraightLineRouter {
    async fn route_distance(
        &self,
        pickup: Coordinate,
        dropoff: Coordinate,
    ) -> Result<TripEstimate, FareError> {
        Ok(self.estimate(pickup, dropoff))
    }
}

/// A fare quote request.
#[derive(Debug, Clone, PartialEq)]
pub struct FareRequest {
    /// Pickup point.
    pub pickup: Coordinate,
    /// Dropoff point.
    pub dropoff: Coordinate,
    /// Requested vehicle/service type.
    pub vehicle_type: String,
    /// Pickup time in the operator's local time zone.
    pub local_time: NaiveDateTime,
}

/// Computes fares from pricing configuration, zones and fare rules.
#[derive(Debug, Clone)]
pub struct FareCalculator {
    pricing: PricingConfig,
}

impl FareCalculator {
    /// Creates a calculator for the given pricing.
    #[must_use]
    pub const fn new(pricing: PricingConfig) -> Self {
        Self { pricing }
    }

    /// The pricing in use.
    #[must_use]
    pub const fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }

    /// Quotes a trip, asking `router` for distance and duration.
    ///
    /// # Errors
    ///
    /// Returns [`FareError::UnknownVehicleType`] if the vehicle type has no
    /// configured rates. Routing failures are not errors; they switch to
    /// the straight-line estimate.
    pub async fn quote(
        &self,
        request: &FareRequest,
        zones: &[Zone],
        rules: &[FareRule],
        router: &dyn RouteDistance,
    ) -> Result<FareQuote, FareError> {
        let (trip, estimated) = match router
            .route_distance(request.pickup, request.dropoff)
            .await
        {
            Ok(trip) => (trip, false),
            Err(e) => {
                log::warn!("Routing failed ({e}), falling back to straight-line estimate");
                let fallback = StraightLineRouter {
                    speed_kmh: self.pricing.fallback_speed_kmh,
                };
                (fallback.estimate(request.pickup, request.dropoff), true)
            }
        };

        self.quote_for_trip(request, trip, estimated, zones, rules)
    }

    /// Quotes a trip whose distance and duration are already known.
    ///
    /// # Errors
    ///
    /// Returns [`FareError::UnknownVehicleType`] if the vehicle type has no
    /// configured rates.
    pub fn quote_for_trip(
        &self,
        request: &FareRequest,
        trip: TripEstimate,
        estimated_trip: bool,
        zones: &[Zone],
        rules: &[FareRule],
    ) -> Result<FareQuote, FareError> {
        let rates = self
            .pricing
            .vehicles
            .get(&request.vehicle_type)
            .ok_or_else(|| FareError::UnknownVehicleType {
                vehicle_type: request.vehicle_type.clone(),
            })?;

        let zone_match = match_zones(
            request.pickup,
            request.dropoff,
            zones,
            self.pricing.cross_zone_surcharge,
        );
        let rule = applicable_rule(request.pickup, &request.vehicle_type, rules, zones);

        let base_fare = rates.base_fare + rule.map_or(0.0, |r| r.base_fare_adjustment);
        let per_km_rate = rates.per_km_rate + rule.map_or(0.0, |r| r.per_km_adjustment);

        let peak_multiplier = peak_multiplier_at(
            request.local_time,
            &self.pricing.peak_windows,
            self.pricing.peak_multiplier,
        );

        let subtotal = trip
            .duration_minutes
            .mul_add(
                rates.per_minute_rate,
                trip.distance_km.mul_add(per_km_rate, base_fare),
            );
        let multiplied = subtotal * peak_multiplier * zone_match.multiplier;
        let minimum_applied = multiplied < self.pricing.minimum_fare;
        let total = round_to(multiplied.max(self.pricing.minimum_fare), 2);

        log::debug!(
            "quote {}: subtotal={subtotal:.2} peak={peak_multiplier} zone={} total={total}",
            request.vehicle_type,
            zone_match.multiplier,
        );

        Ok(FareQuote {
            vehicle_type: request.vehicle_type.clone(),
            trip,
            estimated_trip,
            zones: zone_match,
            applied_rule_id: rule.map(|r| r.id.clone()),
            base_fare,
            per_km_rate,
            per_minute_rate: rates.per_minute_rate,
            peak_multiplier,
            subtotal,
            total,
            minimum_applied,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use taxi_zones_fare_models::{PeakWindow, VehicleRates};
    use taxi_zones_geometry::Polygon;
    use taxi_zones_zone_models::ZoneId;

    fn pricing() -> PricingConfig {
        PricingConfig {
            minimum_fare: 5.0,
            peak_multiplier: 1.2,
            peak_windows: vec![
                PeakWindow {
                    start_hour: 7,
                    end_hour: 9,
                },
                PeakWindow {
                    start_hour: 17,
                    end_hour: 19,
                },
            ],
            cross_zone_surcharge: 1.1,
            fallback_speed_kmh: 30.0,
            vehicles: [(
                "standard".to_string(),
                VehicleRates {
                    base_fare: 3.0,
                    per_km_rate: 1.0,
                    per_minute_rate: 0.5,
                },
            )]
            .into_iter()
            .collect(),
        }
    }

    fn zone(id: &str, min_lng: f64, surcharge: Option<f64>) -> Zone {
        let now = Utc::now();
        Zone {
            id: ZoneId::new(id),
            name: id.to_string(),
            description: String::new(),
            polygon: Polygon::from_outer(vec![
                Coordinate::new(min_lng, 0.0),
                Coordinate::new(min_lng, 1.0),
                Coordinate::new(min_lng + 1.0, 1.0),
                Coordinate::new(min_lng + 1.0, 0.0),
            ]),
            color: "#F58231".to_string(),
            fare_rule_id: None,
            is_active: true,
            surcharge_multiplier: surcharge,
            area_km2: 0.0,
            created_at: now,
            updated_at: now,
            degraded: false,
        }
    }

    fn request(hour: u32) -> FareRequest {
        FareRequest {
            pickup: Coordinate::new(0.5, 0.5),
            dropoff: Coordinate::new(5.5, 0.5),
            vehicle_type: "standard".to_string(),
            // Tuesday
            local_time: NaiveDate::from_ymd_opt(2025, 6, 3)
                .unwrap()
                .and_hms_opt(hour, 15, 0)
                .unwrap(),
        }
    }

    const TRIP: TripEstimate = TripEstimate {
        distance_km: 10.0,
        duration_minutes: 20.0,
    };

    struct FailingRouter;

    #[async_trait::async_trait]
    impl RouteDistance for FailingRouter {
        async fn route_distance(
            &self,
            _pickup: Coordinate,
            _dropoff: Coordinate,
        ) -> Result<TripEstimate, FareError> {
            Err(FareError::Routing {
                message: "no route".to_string(),
            })
        }
    }

    #[test]
    fn off_peak_fare_without_zones() {
        let calc = FareCalculator::new(pricing());
        let quote = calc
            .quote_for_trip(&request(12), TRIP, false, &[], &[])
            .unwrap();
        // 3 + 10 × 1 + 20 × 0.5
        assert!((quote.subtotal - 23.0).abs() < 1e-9);
        assert!((quote.total - 23.0).abs() < 1e-9);
        assert!(!quote.minimum_applied);
    }

    #[test]
    fn peak_and_zone_multipliers_compose() {
        let calc = FareCalculator::new(pricing());
        let zones = vec![zone("a", 0.0, Some(1.1)), zone("b", 5.0, Some(1.05))];
        let quote = calc
            .quote_for_trip(&request(8), TRIP, false, &zones, &[])
            .unwrap();
        assert!((quote.peak_multiplier - 1.2).abs() < f64::EPSILON);
        assert!((quote.zones.multiplier - 1.2705).abs() < 1e-4);
        assert!((quote.total - round_to(23.0 * 1.2 * 1.2705, 2)).abs() < 1e-9);
    }

    #[test]
    fn rule_adjustments_are_added_to_rates() {
        let calc = FareCalculator::new(pricing());
        let zones = vec![zone("a", 0.0, None)];
        let rules = vec![FareRule {
            id: "airport".to_string(),
            name: "Airport".to_string(),
            base_fare_adjustment: 4.0,
            per_km_adjustment: 0.5,
            zone_ids: vec![ZoneId::new("a")],
            vehicle_types: vec!["standard".to_string()],
            is_active: true,
        }];
        let quote = calc
            .quote_for_trip(&request(12), TRIP, false, &zones, &rules)
            .unwrap();
        assert_eq!(quote.applied_rule_id.as_deref(), Some("airport"));
        // 7 + 10 × 1.5 + 20 × 0.5
        assert!((quote.subtotal - 32.0).abs() < 1e-9);
    }

    #[test]
    fn minimum_fare_floors_short_trips() {
        let calc = FareCalculator::new(pricing());
        let short = TripEstimate {
            distance_km: 0.3,
            duration_minutes: 1.0,
        };
        let quote = calc
            .quote_for_trip(&request(12), short, false, &[], &[])
            .unwrap();
        assert!(quote.minimum_applied);
        assert!((quote.total - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_vehicle_type_is_an_error() {
        let calc = FareCalculator::new(pricing());
        let mut req = request(12);
        req.vehicle_type = "helicopter".to_string();
        assert!(matches!(
            calc.quote_for_trip(&req, TRIP, false, &[], &[]),
            Err(FareError::UnknownVehicleType { .. })
        ));
    }

    #[tokio::test]
    async fn routing_failure_falls_back_to_straight_line() {
        let calc = FareCalculator::new(pricing());
        let quote = calc
            .quote(&request(12), &[], &[], &FailingRouter)
            .await
            .unwrap();
        assert!(quote.estimated_trip);
        // Five degrees of longitude along the equator-ish band.
        assert!(quote.trip.distance_km > 550.0 && quote.trip.distance_km < 560.0);
        assert!((quote.trip.duration_minutes - quote.trip.distance_km * 2.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn router_answer_is_used() {
        let calc = FareCalculator::new(pricing());
        let router = StraightLineRouter { speed_kmh: 60.0 };
        let quote = calc.quote(&request(12), &[], &[], &router).await.unwrap();
        assert!(!quote.estimated_trip);
        assert!((quote.trip.duration_minutes - quote.trip.distance_km).abs() < 1e-6);
    }
}

//! Point-in-zone matching and surcharge composition.
//!
//! Zones are assumed not to overlap but nothing enforces it; when they
//! do, the first zone in iteration order wins.

use taxi_zones_fare_models::{FareRule, ZoneMatch};
use taxi_zones_geometry::{Coordinate, point_in_polygon};
use taxi_zones_zone_models::Zone;

/// Cross-zone surcharge applied when pickup and dropoff are in two
/// different zones.
pub const CROSS_ZONE_SURCHARGE: f64 = 1.10;

/// Finds the first active zone containing the point.
#[must_use]
pub fn find_zone(point: Coordinate, zones: &[Zone]) -> Option<&Zone> {
    zones
        .iter()
        .filter(|zone| zone.is_active)
        .find(|zone| point_in_polygon(point, &zone.polygon))
}

/// Matches pickup and dropoff against the zones and composes the zone
/// surcharge multiplier.
///
/// Starts at `1.0`, multiplies in the pickup zone's surcharge and the
/// dropoff zone's surcharge when declared, then `cross_zone_surcharge`
/// when both endpoints are in zones and the zones differ. Peak pricing is
/// not part of this multiplier.
#[must_use]
pub fn match_zones(
    pickup: Coordinate,
    dropoff: Coordinate,
    zones: &[Zone],
    cross_zone_surcharge: f64,
) -> ZoneMatch {
    let pickup_zone = find_zone(pickup, zones);
    let dropoff_zone = find_zone(dropoff, zones);

    let mut multiplier = 1.0;
    if let Some(surcharge) = pickup_zone.and_then(|z| z.surcharge_multiplier) {
        multiplier *= surcharge;
    }
    if let Some(surcharge) = dropoff_zone.and_then(|z| z.surcharge_multiplier) {
        multiplier *= surcharge;
    }

    let cross_zone = matches!((pickup_zone, dropoff_zone), (Some(a), Some(b)) if a.id != b.id);
    if cross_zone {
        multiplier *= cross_zone_surcharge;
    }

    log::debug!(
        "zone match: pickup={:?} dropoff={:?} cross_zone={cross_zone} multiplier={multiplier}",
        pickup_zone.map(|z| z.id.as_str()),
        dropoff_zone.map(|z| z.id.as_str()),
    );

    ZoneMatch {
        pickup_zone: pickup_zone.map(|z| z.id.clone()),
        dropoff_zone: dropoff_zone.map(|z| z.id.clone()),
        cross_zone,
        multiplier,
    }
}

/// Finds the fare rule whose adjustments apply to a trip.
///
/// A rule applies when it is active, lists `vehicle_type`, and the pickup
/// lies inside one of its active zones. Rules are checked in order and the first
/// match wins; adjustments never stack.
#[must_use]
pub fn applicable_rule<'a>(
    pickup: Coordinate,
    vehicle_type: &str,
    rules: &'a [FareRule],
    zones: &[Zone],
) -> Option<&'a FareRule> {
    rules
        .iter()
        .filter(|rule| rule.is_active && rule.covers_vehicle(vehicle_type))
        .find(|rule| {
            zones
                .iter()
                .filter(|zone| zone.is_active && rule.zone_ids.contains(&zone.id))
                .any(|zone| point_in_polygon(pickup, &zone.polygon))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use taxi_zones_geometry::Polygon;
    use taxi_zones_zone_models::ZoneId;

    fn square_zone(id: &str, min_lng: f64, surcharge: Option<f64>) -> Zone {
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
            color: "#3CB44B".to_string(),
            fare_rule_id: None,
            is_active: true,
            surcharge_multiplier: surcharge,
            area_km2: 0.0,
            created_at: now,
            updated_at: now,
            degraded: false,
        }
    }

    fn rule(id: &str, zone: &str, vehicles: &[&str]) -> FareRule {
        FareRule {
            id: id.to_string(),
            name: id.to_string(),
            base_fare_adjustment: 2.0,
            per_km_adjustment: 0.5,
            zone_ids: vec![ZoneId::new(zone)],
            vehicle_types: vehicles.iter().map(ToString::to_string).collect(),
            is_active: true,
        }
    }

    #[test]
    fn cross_zone_trip_composes_all_surcharges() {
        let zones = vec![
            square_zone("a", 0.0, Some(1.1)),
            square_zone("b", 5.0, Some(1.05)),
        ];
        let result = match_zones(
            Coordinate::new(0.5, 0.5),
            Coordinate::new(5.5, 0.5),
            &zones,
            CROSS_ZONE_SURCHARGE,
        );
        assert!(result.cross_zone);
        assert!((result.multiplier - 1.2705).abs() < 0.0001, "{}", result.multiplier);
    }

    #[test]
    fn same_zone_trip_has_no_cross_surcharge() {
        let zones = vec![square_zone("a", 0.0, Some(1.1))];
        let result = match_zones(
            Coordinate::new(0.2, 0.2),
            Coordinate::new(0.8, 0.8),
            &zones,
            CROSS_ZONE_SURCHARGE,
        );
        assert!(!result.cross_zone);
        assert!((result.multiplier - 1.21).abs() < 1e-9);
    }

    #[test]
    fn trip_leaving_zones_only_uses_pickup_surcharge() {
        let zones = vec![square_zone("a", 0.0, Some(1.1))];
        let result = match_zones(
            Coordinate::new(0.5, 0.5),
            Coordinate::new(20.0, 20.0),
            &zones,
            CROSS_ZONE_SURCHARGE,
        );
        assert_eq!(result.dropoff_zone, None);
        assert!(!result.cross_zone);
        assert!((result.multiplier - 1.1).abs() < 1e-9);
    }

    #[test]
    fn no_zones_means_neutral_multiplier() {
        let result = match_zones(
            Coordinate::new(0.5, 0.5),
            Coordinate::new(0.6, 0.6),
            &[],
            CROSS_ZONE_SURCHARGE,
        );
        assert!((result.multiplier - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn first_zone_wins_on_overlap() {
        let zones = vec![square_zone("first", 0.0, None), square_zone("second", 0.0, None)];
        let zone = find_zone(Coordinate::new(0.5, 0.5), &zones).unwrap();
        assert_eq!(zone.id.as_str(), "first");
    }

    #[test]
    fn inactive_zones_are_skipped() {
        let mut inactive = square_zone("off", 0.0, Some(2.0));
        inactive.is_active = false;
        assert!(find_zone(Coordinate::new(0.5, 0.5), &[inactive]).is_none());
    }

    #[test]
    fn rule_requires_vehicle_type_and_pickup_zone() {
        let zones = vec![square_zone("a", 0.0, None), square_zone("b", 5.0, None)];
        let rules = vec![
            rule("exec-only", "a", &["executive"]),
            rule("standard-b", "b", &["standard"]),
            rule("standard-a", "a", &["standard", "van"]),
            rule("standard-a-later", "a", &["standard"]),
        ];

        let found = applicable_rule(Coordinate::new(0.5, 0.5), "standard", &rules, &zones);
        assert_eq!(found.map(|r| r.id.as_str()), Some("standard-a"));

        let none = applicable_rule(Coordinate::new(9.0, 9.0), "standard", &rules, &zones);
        assert!(none.is_none());

        let unknown = applicable_rule(Coordinate::new(0.5, 0.5), "bike", &rules, &zones);
        assert!(unknown.is_none());
    }

    #[test]
    fn inactive_rule_never_matches() {
        let zones = vec![square_zone("a", 0.0, None)];
        let mut off = rule("off", "a", &["standard"]);
        off.is_active = false;
        let rules = [off];
        assert!(applicable_rule(Coordinate::new(0.5, 0.5), "standard", &rules, &zones).is_none());
    }

    #[test]
    fn inactive_zone_does_not_trigger_rule() {
        let mut zone = square_zone("a", 0.0, None);
        zone.is_active = false;
        let zones = [zone];
        let rules = [rule("r", "a", &["standard"])];

        let pickup = Coordinate::new(0.5, 0.5);
        assert!(find_zone(pickup, &zones).is_none());
        assert!(applicable_rule(pickup, "standard", &rules, &zones).is_none());
    }
}

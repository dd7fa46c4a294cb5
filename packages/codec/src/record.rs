//! Whole-zone record encoding.
//!
//! Scalar attributes are stored next to the coordinate keys in one flat
//! record so a single upsert writes every representation at once.
//! Decoding repairs missing or malformed scalars with defaults and never
//! fails.

use chrono::{DateTime, Utc};
use serde_json::Value;
use taxi_zones_geometry::area_km2_for_storage;
use taxi_zones_zone_models::{DEFAULT_ZONE_COLOR, Zone, ZoneId, is_hex_color};

use crate::{CodecError, EncodingProfile, Record, decode_polygon, encode_polygon};

/// Name given to stored zones whose name is missing.
pub const UNNAMED_ZONE: &str = "Unnamed zone";

const NAME_KEY: &str = "name";
const DESCRIPTION_KEY: &str = "description";
const COLOR_KEY: &str = "color";
const FARE_RULE_KEY: &str = "fareRuleId";
const ACTIVE_KEY: &str = "isActive";
const AREA_KEY: &str = "areaKm2";
const SURCHARGE_KEY: &str = "surchargeMultiplier";
const CREATED_AT_KEY: &str = "createdAt";
const UPDATED_AT_KEY: &str = "updatedAt";

/// Encodes a zone into a single store record.
///
/// # Errors
///
/// Returns [`CodecError`] if the zone's polygon cannot be encoded.
pub fn encode_zone(zone: &Zone, profile: EncodingProfile) -> Result<Record, CodecError> {
    let mut record = encode_polygon(&zone.polygon, profile)?;

    record.insert(NAME_KEY.to_string(), Value::String(zone.name.clone()));
    record.insert(
        DESCRIPTION_KEY.to_string(),
        Value::String(zone.description.clone()),
    );
    record.insert(COLOR_KEY.to_string(), Value::String(zone.color.clone()));
    record.insert(
        FARE_RULE_KEY.to_string(),
        zone.fare_rule_id
            .clone()
            .map_or(Value::Null, Value::String),
    );
    record.insert(ACTIVE_KEY.to_string(), Value::Bool(zone.is_active));
    record.insert(AREA_KEY.to_string(), Value::from(zone.area_km2));
    record.insert(
        SURCHARGE_KEY.to_string(),
        zone.surcharge_multiplier.map_or(Value::Null, Value::from),
    );
    record.insert(
        CREATED_AT_KEY.to_string(),
        Value::String(zone.created_at.to_rfc3339()),
    );
    record.insert(
        UPDATED_AT_KEY.to_string(),
        Value::String(zone.updated_at.to_rfc3339()),
    );

    Ok(record)
}

/// Decodes a store record into a zone.
///
/// Coordinates go through [`decode_polygon`]; a degraded decode sets
/// [`Zone::degraded`] and recomputes the area from the substituted shape.
#[must_use]
pub fn decode_zone(id: &str, record: &Record) -> Zone {
    let decoded = decode_polygon(record);
    let degraded = decoded.is_degraded();
    if degraded {
        log::warn!("Zone {id}: no stored coordinate form decoded, substituting default square");
    }

    let name = string_field(record, NAME_KEY)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| UNNAMED_ZONE.to_string());

    let color = string_field(record, COLOR_KEY)
        .filter(|c| is_hex_color(c))
        .unwrap_or_else(|| DEFAULT_ZONE_COLOR.to_string());

    let area_km2 = record
        .get(AREA_KEY)
        .and_then(Value::as_f64)
        .filter(|a| !degraded && a.is_finite() && *a > 0.0)
        .unwrap_or_else(|| area_km2_for_storage(&decoded.polygon));

    let created_at = timestamp_field(record, CREATED_AT_KEY).unwrap_or(DateTime::UNIX_EPOCH);
    let updated_at = timestamp_field(record, UPDATED_AT_KEY).unwrap_or(created_at);

    Zone {
        id: ZoneId::new(id),
        name,
        description: string_field(record, DESCRIPTION_KEY).unwrap_or_default(),
        polygon: decoded.polygon,
        color,
        fare_rule_id: string_field(record, FARE_RULE_KEY).filter(|s| !s.is_empty()),
        is_active: record
            .get(ACTIVE_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(true),
        surcharge_multiplier: record
            .get(SURCHARGE_KEY)
            .and_then(Value::as_f64)
            .filter(|m| m.is_finite() && *m > 0.0),
        area_km2,
        created_at,
        updated_at,
        degraded,
    }
}

fn string_field(record: &Record, key: &str) -> Option<String> {
    record.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Accepts RFC 3339 strings and epoch-millisecond numbers.
fn timestamp_field(record: &Record, key: &str) -> Option<DateTime<Utc>> {
    match record.get(key)? {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OBJECT_FORM_KEY, PRIMARY_TEXT_KEY, SECONDARY_TEXT_KEY};
    use chrono::TimeZone as _;
    use serde_json::json;
    use taxi_zones_geometry::{Coordinate, Polygon, unit_square};

    fn sample_zone() -> Zone {
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        let polygon = Polygon::from_outer(vec![
            Coordinate::new(-0.142, 51.501),
            Coordinate::new(-0.142, 51.515),
            Coordinate::new(-0.120, 51.515),
            Coordinate::new(-0.120, 51.501),
        ]);
        Zone {
            id: ZoneId::new("zone-7"),
            name: "Westminster".to_string(),
            description: "Congestion area".to_string(),
            area_km2: area_km2_for_storage(&polygon),
            polygon,
            color: "#911EB4".to_string(),
            fare_rule_id: Some("rule-central".to_string()),
            is_active: true,
            surcharge_multiplier: Some(1.15),
            created_at: created,
            updated_at: created + chrono::Duration::days(2),
            degraded: false,
        }
    }

    #[test]
    fn zone_round_trip() {
        let zone = sample_zone();
        let record = encode_zone(&zone, EncodingProfile::Redundant).unwrap();
        let mut decoded = decode_zone("zone-7", &record);

        let original_ring = &zone.polygon.rings[0];
        let decoded_ring = &decoded.polygon.rings[0];
        assert_eq!(decoded_ring.len(), original_ring.len());
        for (a, b) in decoded_ring.iter().zip(original_ring) {
            assert!((a.lng - b.lng).abs() < 1e-9 && (a.lat - b.lat).abs() < 1e-9);
        }

        decoded.polygon = zone.polygon.clone();
        assert_eq!(decoded, zone);
    }

    #[test]
    fn record_is_flat_with_all_forms() {
        let record = encode_zone(&sample_zone(), EncodingProfile::Redundant).unwrap();
        for key in [
            NAME_KEY,
            DESCRIPTION_KEY,
            COLOR_KEY,
            FARE_RULE_KEY,
            ACTIVE_KEY,
            AREA_KEY,
            CREATED_AT_KEY,
            UPDATED_AT_KEY,
            PRIMARY_TEXT_KEY,
            SECONDARY_TEXT_KEY,
            OBJECT_FORM_KEY,
        ] {
            assert!(record.contains_key(key), "missing {key}");
        }
    }

    #[test]
    fn empty_record_decodes_with_defaults() {
        let zone = decode_zone("legacy-1", &Record::new());
        assert!(zone.degraded);
        assert_eq!(zone.name, UNNAMED_ZONE);
        assert_eq!(zone.color, DEFAULT_ZONE_COLOR);
        assert!(zone.is_active);
        assert_eq!(zone.polygon, unit_square());
        assert!(zone.area_km2 > 0.0);
        assert_eq!(zone.created_at, DateTime::UNIX_EPOCH);
    }

    #[test]
    fn corrupt_scalars_are_repaired() {
        let mut record = encode_zone(&sample_zone(), EncodingProfile::Canonical).unwrap();
        record.insert(NAME_KEY.to_string(), json!(""));
        record.insert(COLOR_KEY.to_string(), json!("blue"));
        record.insert(ACTIVE_KEY.to_string(), json!("yes"));
        record.insert(AREA_KEY.to_string(), json!(null));
        record.insert(SURCHARGE_KEY.to_string(), json!(-2.0));
        record.insert(CREATED_AT_KEY.to_string(), json!(1_735_689_600_000_i64));
        record.insert(UPDATED_AT_KEY.to_string(), json!("yesterday"));

        let zone = decode_zone("zone-7", &record);
        assert!(!zone.degraded);
        assert_eq!(zone.name, UNNAMED_ZONE);
        assert_eq!(zone.color, DEFAULT_ZONE_COLOR);
        assert!(zone.is_active);
        assert_eq!(zone.surcharge_multiplier, None);
        assert!((zone.area_km2 - sample_zone().area_km2).abs() < 1e-9);
        assert_eq!(zone.created_at.timestamp(), 1_735_689_600);
        assert_eq!(zone.updated_at, zone.created_at);
    }

    #[test]
    fn degraded_zone_recomputes_area() {
        let mut record = Record::new();
        record.insert(AREA_KEY.to_string(), json!(3.5));
        let zone = decode_zone("broken", &record);
        assert!(zone.degraded);
        assert!((zone.area_km2 - area_km2_for_storage(&unit_square())).abs() < 1e-9);
    }
}

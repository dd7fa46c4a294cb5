//! Array-free object form of a polygon.
//!
//! ```text
//! {
//!   "ringCount": 1,
//!   "ring_0": {
//!     "pointCount": 4,
//!     "point_0": { "lng": 0.0, "lat": 0.0 },
//!     ...
//!   }
//! }
//! ```
//!
//! This form only exists for stores that reject nested arrays. It is
//! never preferred over the text forms when decoding.

use serde_json::{Map, Value};
use taxi_zones_geometry::{Coordinate, Polygon, Ring};

const RING_COUNT_KEY: &str = "ringCount";
const POINT_COUNT_KEY: &str = "pointCount";

/// Upper bound on declared counts, so a corrupt count cannot drive a huge
/// allocation.
const MAX_DECLARED_COUNT: u64 = 1_000_000;

/// Converts a polygon into the keyed object form.
#[must_use]
pub fn to_object(polygon: &Polygon) -> Map<String, Value> {
    let mut root = Map::new();
    root.insert(RING_COUNT_KEY.to_string(), Value::from(polygon.rings.len()));

    for (ring_index, ring) in polygon.rings.iter().enumerate() {
        let mut ring_obj = Map::new();
        ring_obj.insert(POINT_COUNT_KEY.to_string(), Value::from(ring.len()));

        for (point_index, coord) in ring.iter().enumerate() {
            let mut point = Map::new();
            point.insert("lng".to_string(), Value::from(coord.lng));
            point.insert("lat".to_string(), Value::from(coord.lat));
            ring_obj.insert(format!("point_{point_index}"), Value::Object(point));
        }

        root.insert(format!("ring_{ring_index}"), Value::Object(ring_obj));
    }

    root
}

/// Rebuilds a polygon from the keyed object form.
///
/// Every declared ring and point must be present with numeric `lng` and
/// `lat`; any gap rejects the whole form.
#[must_use]
pub fn from_object(root: &Map<String, Value>) -> Option<Polygon> {
    let ring_count = declared_count(root, RING_COUNT_KEY)?;
    if ring_count == 0 {
        return None;
    }

    let rings = (0..ring_count)
        .map(|ring_index| {
            let ring_obj = root.get(&format!("ring_{ring_index}"))?.as_object()?;
            read_ring(ring_obj)
        })
        .collect::<Option<Vec<_>>>()?;

    Some(Polygon { rings })
}

fn read_ring(ring_obj: &Map<String, Value>) -> Option<Ring> {
    let point_count = declared_count(ring_obj, POINT_COUNT_KEY)?;

    (0..point_count)
        .map(|point_index| {
            let point = ring_obj.get(&format!("point_{point_index}"))?;
            let lng = point.get("lng")?.as_f64()?;
            let lat = point.get("lat")?.as_f64()?;
            Some(Coordinate::new(lng, lat))
        })
        .collect()
}

fn declared_count(obj: &Map<String, Value>, key: &str) -> Option<u64> {
    obj.get(key)?
        .as_u64()
        .filter(|count| *count <= MAX_DECLARED_COUNT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use taxi_zones_geometry::unit_square;

    #[test]
    fn object_form_has_no_arrays() {
        fn contains_array(value: &Value) -> bool {
            match value {
                Value::Array(_) => true,
                Value::Object(map) => map.values().any(contains_array),
                _ => false,
            }
        }

        let obj = Value::Object(to_object(&unit_square()));
        assert!(!contains_array(&obj));
        assert_eq!(obj["ringCount"], json!(1));
        assert_eq!(obj["ring_0"]["pointCount"], json!(5));
        assert_eq!(obj["ring_0"]["point_2"], json!({ "lng": 1.0, "lat": 1.0 }));
    }

    #[test]
    fn reads_back_what_it_writes() {
        assert_eq!(from_object(&to_object(&unit_square())), Some(unit_square()));
    }

    #[test]
    fn missing_point_rejects_form() {
        let mut obj = to_object(&unit_square());
        if let Some(Value::Object(ring)) = obj.get_mut("ring_0") {
            ring.remove("point_3");
        }
        assert_eq!(from_object(&obj), None);
    }

    #[test]
    fn missing_ring_rejects_form() {
        let obj = json!({ "ringCount": 2, "ring_0": { "pointCount": 0 } });
        assert_eq!(from_object(obj.as_object().unwrap()), None);
    }

    #[test]
    fn zero_rings_rejects_form() {
        let obj = json!({ "ringCount": 0 });
        assert_eq!(from_object(obj.as_object().unwrap()), None);
    }

    #[test]
    fn absurd_count_rejects_form() {
        let obj = json!({ "ringCount": u64::MAX });
        assert_eq!(from_object(obj.as_object().unwrap()), None);
    }
}

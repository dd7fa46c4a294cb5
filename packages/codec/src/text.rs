//! `GeoJSON` text form and the legacy embedded geometry.

use geojson::GeoJson;
use taxi_zones_geometry::{Coordinate, Polygon, Ring};

/// Serializes a polygon as a `GeoJSON` `Polygon` geometry string.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn to_polygon_text(polygon: &Polygon) -> Result<String, serde_json::Error> {
    let rings: Vec<Vec<Vec<f64>>> = polygon
        .rings
        .iter()
        .map(|ring| ring.iter().map(|c| vec![c.lng, c.lat]).collect())
        .collect();

    let geometry = geojson::Geometry::new(geojson::Value::Polygon(rings));
    serde_json::to_string(&geometry)
}

/// Parses a serialized polygon.
///
/// Accepts a `GeoJSON` `Polygon` geometry string, which is what
/// [`to_polygon_text`] writes, and a bare `[[[lng, lat], ...]]`
/// coordinate array, which some hand-migrated records contain.
#[must_use]
pub fn parse_polygon_text(text: &str) -> Option<Polygon> {
    let trimmed = text.trim();
    if trimmed.starts_with('[') {
        let value: serde_json::Value = serde_json::from_str(trimmed).ok()?;
        return rings_from_json(&value);
    }

    match trimmed.parse::<GeoJson>().ok()? {
        GeoJson::Geometry(geometry) => polygon_from_geojson_value(&geometry.value),
        GeoJson::Feature(feature) => polygon_from_geojson_value(&feature.geometry?.value),
        GeoJson::FeatureCollection(_) => None,
    }
}

/// Reads the legacy `coordinates: {type, coordinates}` embed.
///
/// Only a declared type of `Polygon` is accepted.
#[must_use]
pub fn parse_legacy_geometry(value: &serde_json::Value) -> Option<Polygon> {
    if value.get("type").and_then(serde_json::Value::as_str) != Some("Polygon") {
        return None;
    }
    rings_from_json(value.get("coordinates")?)
}

fn polygon_from_geojson_value(value: &geojson::Value) -> Option<Polygon> {
    match value {
        geojson::Value::Polygon(rings) => {
            let rings = rings
                .iter()
                .map(|ring| ring.iter().map(|p| position(p)).collect::<Option<Ring>>())
                .collect::<Option<Vec<_>>>()?;
            Some(Polygon { rings })
        }
        _ => None,
    }
}

fn position(pos: &[f64]) -> Option<Coordinate> {
    match pos {
        [lng, lat, ..] => Some(Coordinate::new(*lng, *lat)),
        _ => None,
    }
}

fn rings_from_json(value: &serde_json::Value) -> Option<Polygon> {
    let rings = value
        .as_array()?
        .iter()
        .map(|ring| {
            ring.as_array()?
                .iter()
                .map(|point| {
                    let pair = point.as_array()?;
                    let lng = pair.first()?.as_f64()?;
                    let lat = pair.get(1)?.as_f64()?;
                    Some(Coordinate::new(lng, lat))
                })
                .collect::<Option<Ring>>()
        })
        .collect::<Option<Vec<_>>>()?;

    if rings.is_empty() {
        return None;
    }
    Some(Polygon { rings })
}

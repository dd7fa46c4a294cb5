//! Synthesized shapes: the default drawing square and the decode fallback.

use crate::{Coordinate, METERS_PER_DEGREE_LAT, Polygon};

/// Builds an axis-aligned square of `side_km` centered on `center`.
///
/// The half-side is converted to degrees with the same local
/// meters-per-degree approximation the area computation uses, so the
/// resulting polygon reports an area close to `side_km²`. Near the poles
/// the longitude span is clamped to avoid dividing by a vanishing cosine.
#[must_use]
pub fn default_square(center: Coordinate, side_km: f64) -> Polygon {
    let half_m = side_km.abs() * 1_000.0 / 2.0;
    let d_lat = half_m / METERS_PER_DEGREE_LAT;
    let cos_lat = center.lat.to_radians().cos().max(0.01);
    let d_lng = half_m / (METERS_PER_DEGREE_LAT * cos_lat);

    Polygon::from_outer(vec![
        Coordinate::new(center.lng - d_lng, center.lat - d_lat),
        Coordinate::new(center.lng - d_lng, center.lat + d_lat),
        Coordinate::new(center.lng + d_lng, center.lat + d_lat),
        Coordinate::new(center.lng + d_lng, center.lat - d_lat),
    ])
}

/// The fixed unit square `(0,0),(0,1),(1,1),(1,0)` used when a stored
/// polygon cannot be recovered from any known form.
#[must_use]
pub fn unit_square() -> Polygon {
    Polygon::from_outer(vec![
        Coordinate::new(0.0, 0.0),
        Coordinate::new(0.0, 1.0),
        Coordinate::new(1.0, 1.0),
        Coordinate::new(1.0, 0.0),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{is_closed, is_valid_polygon, planar_area_km2, point_in_polygon};

    #[test]
    fn default_square_is_valid_and_closed() {
        let square = default_square(Coordinate::new(-0.1276, 51.5072), 1.5);
        assert!(is_valid_polygon(&square));
        assert!(is_closed(&square.rings[0]));
        assert_eq!(square.rings[0].len(), 5);
    }

    #[test]
    fn default_square_area_matches_side() {
        let square = default_square(Coordinate::new(-0.1276, 51.5072), 2.0);
        let area = planar_area_km2(&square);
        assert!((area - 4.0).abs() < 0.01, "area was {area}");
    }

    #[test]
    fn default_square_contains_its_center() {
        let center = Coordinate::new(55.2708, 25.2048);
        assert!(point_in_polygon(center, &default_square(center, 1.0)));
    }

    #[test]
    fn unit_square_shape() {
        let square = unit_square();
        assert_eq!(square.rings.len(), 1);
        assert_eq!(square.rings[0].len(), 5);
        assert_eq!(square.rings[0][2], Coordinate::new(1.0, 1.0));
    }
}

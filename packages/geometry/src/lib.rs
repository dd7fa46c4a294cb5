#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Planar polygon kernel for service zones.
//!
//! Zones are stored as `(lng, lat)` rings in degrees. Everything here is a
//! planar approximation: areas come from the shoelace formula in degree
//! space scaled by a local meters-per-degree factor, and containment is a
//! ray-casting parity test. None of these functions panic on malformed
//! input; they fall back to an empty or zero result instead, so callers
//! must validate untrusted shapes before relying on the output.

pub mod shapes;

use serde::{Deserialize, Serialize};

pub use shapes::{default_square, unit_square};

/// Meters per degree of latitude used by the local area approximation.
pub const METERS_PER_DEGREE_LAT: f64 = 111_200.0;

/// A planar coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Longitude in degrees.
    pub lng: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl Coordinate {
    /// Creates a coordinate from a longitude/latitude pair.
    #[must_use]
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Returns `true` if both components are finite numbers.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.lng.is_finite() && self.lat.is_finite()
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lng, lat): (f64, f64)) -> Self {
        Self { lng, lat }
    }
}

/// An ordered sequence of coordinates bounding a polygon or a hole.
pub type Ring = Vec<Coordinate>;

/// A polygon made of an outer ring followed by zero or more hole rings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    /// Outer boundary first, holes after.
    pub rings: Vec<Ring>,
}

impl Polygon {
    /// Creates a polygon from raw rings, closing each one.
    #[must_use]
    pub fn new(rings: Vec<Ring>) -> Self {
        Self {
            rings: rings.into_iter().map(close_ring).collect(),
        }
    }

    /// Creates a single-ring polygon from a list of vertices.
    #[must_use]
    pub fn from_outer(vertices: Vec<Coordinate>) -> Self {
        Self::new(vec![vertices])
    }

    /// Returns the outer ring, if any.
    #[must_use]
    pub fn outer(&self) -> Option<&Ring> {
        self.rings.first()
    }

    /// Returns the hole rings.
    #[must_use]
    pub fn holes(&self) -> &[Ring] {
        self.rings.get(1..).unwrap_or(&[])
    }

    /// Returns `true` if the polygon has no rings or an empty outer ring.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outer().is_none_or(Vec::is_empty)
    }

    /// Total number of stored coordinates across all rings.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.rings.iter().map(Vec::len).sum()
    }
}

/// Axis-aligned bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western edge.
    pub min_lng: f64,
    /// Southern edge.
    pub min_lat: f64,
    /// Eastern edge.
    pub max_lng: f64,
    /// Northern edge.
    pub max_lat: f64,
}

impl BoundingBox {
    /// Returns `true` if the point falls inside or on the box.
    #[must_use]
    pub fn contains(&self, point: Coordinate) -> bool {
        point.lng >= self.min_lng
            && point.lng <= self.max_lng
            && point.lat >= self.min_lat
            && point.lat <= self.max_lat
    }
}

/// Closes a ring by appending a copy of its first coordinate when the
/// first and last coordinates differ.
///
/// Idempotent. An empty ring is returned unchanged.
#[must_use]
pub fn close_ring(mut ring: Ring) -> Ring {
    match (ring.first().copied(), ring.last()) {
        (Some(first), Some(last)) if first != *last => ring.push(first),
        _ => {}
    }
    ring
}

/// Returns `true` if the ring's first and last coordinates are identical.
#[must_use]
pub fn is_closed(ring: &[Coordinate]) -> bool {
    matches!((ring.first(), ring.last()), (Some(a), Some(b)) if a == b)
}

/// Returns the ring's vertices without the closing duplicate.
#[must_use]
pub fn open_vertices(ring: &[Coordinate]) -> &[Coordinate] {
    if ring.len() > 1 && is_closed(ring) {
        &ring[..ring.len() - 1]
    } else {
        ring
    }
}

/// Counts distinct vertices in a ring, ignoring order and the closing
/// duplicate.
#[must_use]
pub fn distinct_vertex_count(ring: &[Coordinate]) -> usize {
    let mut seen: Vec<Coordinate> = Vec::with_capacity(ring.len());
    for coord in ring {
        if !seen.contains(coord) {
            seen.push(*coord);
        }
    }
    seen.len()
}

/// Checks that a polygon is usable as a zone boundary.
///
/// Requires at least one ring, an outer ring with at least four
/// coordinates after closing and at least three distinct vertices, and
/// only finite coordinates in every ring.
#[must_use]
pub fn is_valid_polygon(polygon: &Polygon) -> bool {
    let Some(outer) = polygon.outer() else {
        return false;
    };

    if polygon
        .rings
        .iter()
        .flatten()
        .any(|coord| !coord.is_finite())
    {
        return false;
    }

    let closed = close_ring(outer.clone());
    closed.len() >= 4 && distinct_vertex_count(&closed) >= 3
}

/// Computes the polygon's outer-ring area in square kilometers.
///
/// Uses the shoelace area in degree space and scales it by
/// [`METERS_PER_DEGREE_LAT`] for latitude and
/// `METERS_PER_DEGREE_LAT * cos(lat)` for longitude, evaluated at the
/// mean latitude of the ring's vertices. Holes are ignored. Returns `0.0`
/// for rings with fewer than three vertices or non-finite coordinates.
#[must_use]
pub fn planar_area_km2(polygon: &Polygon) -> f64 {
    use geo::Area as _;

    let Some(outer) = polygon.outer() else {
        return 0.0;
    };
    let vertices = open_vertices(outer);
    if vertices.len() < 3 || vertices.iter().any(|c| !c.is_finite()) {
        return 0.0;
    }

    let Some(center) = centroid(outer) else {
        return 0.0;
    };

    let ring = to_geo_line_string(outer);
    let degree_area = geo::Polygon::new(ring, vec![]).unsigned_area();

    let meters_per_degree_lng = METERS_PER_DEGREE_LAT * center.lat.to_radians().cos();
    let area_m2 = degree_area * METERS_PER_DEGREE_LAT * meters_per_degree_lng;

    (area_m2 / 1_000_000.0).abs()
}

/// [`planar_area_km2`] rounded to 4 decimal places for storage.
#[must_use]
pub fn area_km2_for_storage(polygon: &Polygon) -> f64 {
    round_to(planar_area_km2(polygon), 4)
}

/// [`planar_area_km2`] rounded to 2 decimal places for display.
#[must_use]
pub fn area_km2_for_display(polygon: &Polygon) -> f64 {
    round_to(planar_area_km2(polygon), 2)
}

/// Rounds `value` to `places` decimal places.
#[must_use]
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}

/// Mean of the ring's distinct vertices, skipping the closing duplicate.
#[must_use]
pub fn centroid(ring: &[Coordinate]) -> Option<Coordinate> {
    let vertices = open_vertices(ring);
    if vertices.is_empty() {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let n = vertices.len() as f64;
    let (sum_lng, sum_lat) = vertices
        .iter()
        .fold((0.0, 0.0), |(lng, lat), c| (lng + c.lng, lat + c.lat));

    Some(Coordinate::new(sum_lng / n, sum_lat / n))
}

/// Bounding box of every coordinate in the polygon.
#[must_use]
pub fn bounding_box(polygon: &Polygon) -> Option<BoundingBox> {
    let mut coords = polygon.rings.iter().flatten().filter(|c| c.is_finite());
    let first = coords.next()?;

    Some(coords.fold(
        BoundingBox {
            min_lng: first.lng,
            min_lat: first.lat,
            max_lng: first.lng,
            max_lat: first.lat,
        },
        |bbox, c| BoundingBox {
            min_lng: bbox.min_lng.min(c.lng),
            min_lat: bbox.min_lat.min(c.lat),
            max_lng: bbox.max_lng.max(c.lng),
            max_lat: bbox.max_lat.max(c.lat),
        },
    ))
}

/// Ray-casting parity test against a single ring.
///
/// Casts a horizontal ray from the point toward +∞ longitude and counts
/// edge crossings; an odd count means inside. Boundary points get no
/// special handling: with the inclusive crossing comparison used here a
/// point on a west-facing edge counts as outside, but other boundary
/// positions may land either way. Treat boundary classification as an
/// approximation.
#[must_use]
pub fn point_in_ring(point: Coordinate, ring: &[Coordinate]) -> bool {
    if !point.is_finite() || ring.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = ring.len() - 1;

    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[j];

        if (a.lat > point.lat) != (b.lat > point.lat) {
            let crossing_lng = (b.lng - a.lng) * (point.lat - a.lat) / (b.lat - a.lat) + a.lng;
            if point.lng <= crossing_lng {
                inside = !inside;
            }
        }

        j = i;
    }

    inside
}

/// Returns `true` if the point is inside the outer ring and not inside any
/// hole.
#[must_use]
pub fn point_in_polygon(point: Coordinate, polygon: &Polygon) -> bool {
    let Some(outer) = polygon.outer() else {
        return false;
    };

    point_in_ring(point, outer) && !polygon.holes().iter().any(|h| point_in_ring(point, h))
}

/// Great-circle distance between two coordinates in kilometers.
#[must_use]
pub fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
    use geo::{Distance as _, Haversine};

    if !from.is_finite() || !to.is_finite() {
        return 0.0;
    }

    let meters = Haversine.distance(
        geo::Point::new(from.lng, from.lat),
        geo::Point::new(to.lng, to.lat),
    );
    meters / 1_000.0
}

fn to_geo_line_string(ring: &[Coordinate]) -> geo::LineString<f64> {
    geo::LineString::from(ring.iter().map(|c| (c.lng, c.lat)).collect::<Vec<_>>())
}

impl From<&Polygon> for geo::Polygon<f64> {
    fn from(polygon: &Polygon) -> Self {
        let exterior = polygon
            .outer()
            .map_or_else(|| geo::LineString::new(vec![]), |r| to_geo_line_string(r));
        let interiors = polygon
            .holes()
            .iter()
            .map(|r| to_geo_line_string(r))
            .collect();
        Self::new(exterior, interiors)
    }
}

impl From<&geo::Polygon<f64>> for Polygon {
    fn from(polygon: &geo::Polygon<f64>) -> Self {
        let convert = |ls: &geo::LineString<f64>| -> Ring {
            ls.coords().map(|c| Coordinate::new(c.x, c.y)).collect()
        };

        let mut rings = vec![convert(polygon.exterior())];
        rings.extend(polygon.interiors().iter().map(convert));
        Self::new(rings)
    }
}

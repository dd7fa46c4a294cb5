#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Service zone entity, draft and validation types.
//!
//! A [`Zone`] is a named polygonal area that fares are matched against.
//! Zones start life as a [`ZoneDraft`] carrying the [`ZoneId::DRAFT`]
//! placeholder identifier and only become a [`Zone`] once the repository
//! has validated and persisted them.

use std::fmt;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom as _;
use serde::{Deserialize, Serialize};
use taxi_zones_geometry::{Polygon, distinct_vertex_count, is_valid_polygon};
use thiserror::Error;

/// Display colors handed out to new zones.
pub const ZONE_COLOR_PALETTE: &[&str] = &[
    "#E6194B", "#3CB44B", "#FFE119", "#4363D8", "#F58231", "#911EB4", "#46F0F0", "#F032E6",
    "#BCF60C", "#008080", "#9A6324", "#800000",
];

/// Color used when a stored zone has no usable color.
pub const DEFAULT_ZONE_COLOR: &str = "#4363D8";

/// Zone identifier as assigned by the repository.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(String);

impl ZoneId {
    /// Placeholder identifier for zones that have not been persisted yet.
    pub const DRAFT: &'static str = "draft";

    /// Wraps an existing identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The placeholder identifier carried by uncommitted drafts.
    #[must_use]
    pub fn draft() -> Self {
        Self(Self::DRAFT.to_string())
    }

    /// Generates a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns `true` for the draft placeholder.
    #[must_use]
    pub fn is_draft(&self) -> bool {
        self.0 == Self::DRAFT
    }

    /// Borrows the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ZoneId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A committed, persisted service zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    /// Repository-assigned identifier.
    pub id: ZoneId,
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Zone boundary.
    pub polygon: Polygon,
    /// Display color (`#RRGGBB`).
    pub color: String,
    /// Linked fare rule, if any.
    pub fare_rule_id: Option<String>,
    /// Inactive zones are ignored by fare matching.
    pub is_active: bool,
    /// Multiplier applied to fares starting or ending in this zone.
    pub surcharge_multiplier: Option<f64>,
    /// Boundary area in km², 4 decimal places.
    pub area_km2: f64,
    /// When the zone was first persisted.
    pub created_at: DateTime<Utc>,
    /// When the zone was last written.
    pub updated_at: DateTime<Utc>,
    /// Set when the stored boundary could not be decoded and a fallback
    /// shape was substituted.
    #[serde(default)]
    pub degraded: bool,
}

/// An uncommitted zone being created or edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneDraft {
    /// [`ZoneId::DRAFT`] for new zones, the existing id when editing.
    pub id: ZoneId,
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Boundary, empty until drawn.
    pub polygon: Polygon,
    /// Display color.
    pub color: String,
    /// Linked fare rule, if any.
    pub fare_rule_id: Option<String>,
    /// Active flag.
    pub is_active: bool,
    /// Optional zone surcharge.
    pub surcharge_multiplier: Option<f64>,
}

impl ZoneDraft {
    /// Creates an empty draft with a random palette color.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ZoneId::draft(),
            name: name.into(),
            description: String::new(),
            polygon: Polygon::default(),
            color: random_zone_color(),
            fare_rule_id: None,
            is_active: true,
            surcharge_multiplier: None,
        }
    }

    /// Opens an existing zone for editing.
    #[must_use]
    pub fn from_zone(zone: &Zone) -> Self {
        Self {
            id: zone.id.clone(),
            name: zone.name.clone(),
            description: zone.description.clone(),
            polygon: zone.polygon.clone(),
            color: zone.color.clone(),
            fare_rule_id: zone.fare_rule_id.clone(),
            is_active: zone.is_active,
            surcharge_multiplier: zone.surcharge_multiplier,
        }
    }

    /// Returns `true` if this draft has never been persisted.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.id.is_draft()
    }

    /// Checks everything the repository requires before a write.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }

        if let Some(outer) = self.polygon.outer() {
            let distinct = distinct_vertex_count(outer);
            if distinct < 3 {
                return Err(ValidationError::TooFewVertices { count: distinct });
            }
        } else {
            return Err(ValidationError::TooFewVertices { count: 0 });
        }

        if !is_valid_polygon(&self.polygon) {
            return Err(ValidationError::InvalidPolygon);
        }

        if !is_hex_color(&self.color) {
            return Err(ValidationError::InvalidColor {
                color: self.color.clone(),
            });
        }

        if let Some(multiplier) = self.surcharge_multiplier
            && !(multiplier.is_finite() && multiplier > 0.0)
        {
            return Err(ValidationError::InvalidSurcharge { multiplier });
        }

        Ok(())
    }
}

/// Input validation failures. These are reported to the caller and never
/// repaired automatically.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Zone name is empty after trimming.
    #[error("Zone name must not be empty")]
    EmptyName,

    /// Outer ring has fewer than three distinct vertices.
    #[error("Zone boundary needs at least 3 distinct vertices, found {count}")]
    TooFewVertices {
        /// Distinct vertex count found.
        count: usize,
    },

    /// Polygon failed the geometry validity check.
    #[error("Zone boundary is not a valid polygon")]
    InvalidPolygon,

    /// Color is not a `#RRGGBB` hex string.
    #[error("Invalid zone color: {color}")]
    InvalidColor {
        /// The rejected color.
        color: String,
    },

    /// Surcharge multiplier is not a positive finite number.
    #[error("Invalid surcharge multiplier: {multiplier}")]
    InvalidSurcharge {
        /// The rejected multiplier.
        multiplier: f64,
    },
}

/// Picks a random color from [`ZONE_COLOR_PALETTE`].
#[must_use]
pub fn random_zone_color() -> String {
    ZONE_COLOR_PALETTE
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(DEFAULT_ZONE_COLOR)
        .to_string()
}

/// Returns `true` for `#RRGGBB` hex color strings.
#[must_use]
pub fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color.chars().skip(1).all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use taxi_zones_geometry::{Coordinate, unit_square};

    fn triangle_draft() -> ZoneDraft {
        let mut draft = ZoneDraft::new("Airport");
        draft.polygon = Polygon::from_outer(vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 1.0),
            Coordinate::new(1.0, 1.0),
        ]);
        draft
    }

    #[test]
    fn new_draft_uses_placeholder_id() {
        let draft = ZoneDraft::new("Downtown");
        assert!(draft.is_new());
        assert_eq!(draft.id.as_str(), ZoneId::DRAFT);
        assert!(draft.polygon.is_empty());
        assert!(ZONE_COLOR_PALETTE.contains(&draft.color.as_str()));
    }

    #[test]
    fn generated_ids_are_not_drafts() {
        let a = ZoneId::generate();
        let b = ZoneId::generate();
        assert!(!a.is_draft());
        assert_ne!(a, b);
    }

    #[test]
    fn valid_draft_passes() {
        assert_eq!(triangle_draft().validate(), Ok(()));
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut draft = triangle_draft();
        draft.name = "   ".to_string();
        assert_eq!(draft.validate(), Err(ValidationError::EmptyName));
    }

    #[test]
    fn empty_polygon_is_rejected() {
        let draft = ZoneDraft::new("Empty");
        assert_eq!(
            draft.validate(),
            Err(ValidationError::TooFewVertices { count: 0 })
        );
    }

    #[test]
    fn two_vertices_are_rejected() {
        let mut draft = ZoneDraft::new("Line");
        draft.polygon =
            Polygon::from_outer(vec![Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 0.0)]);
        assert_eq!(
            draft.validate(),
            Err(ValidationError::TooFewVertices { count: 2 })
        );
    }

    #[test]
    fn bad_color_is_rejected() {
        let mut draft = triangle_draft();
        draft.color = "red".to_string();
        assert!(matches!(
            draft.validate(),
            Err(ValidationError::InvalidColor { .. })
        ));
    }

    #[test]
    fn non_positive_surcharge_is_rejected() {
        let mut draft = triangle_draft();
        draft.surcharge_multiplier = Some(0.0);
        assert!(matches!(
            draft.validate(),
            Err(ValidationError::InvalidSurcharge { .. })
        ));
    }

    #[test]
    fn from_zone_keeps_identity() {
        let now = Utc::now();
        let zone = Zone {
            id: ZoneId::new("zone-1"),
            name: "Harbor".to_string(),
            description: "Port area".to_string(),
            polygon: unit_square(),
            color: "#008080".to_string(),
            fare_rule_id: Some("rule-1".to_string()),
            is_active: true,
            surcharge_multiplier: Some(1.2),
            area_km2: 12_364.0,
            created_at: now,
            updated_at: now,
            degraded: false,
        };
        let draft = ZoneDraft::from_zone(&zone);
        assert!(!draft.is_new());
        assert_eq!(draft.id, zone.id);
        assert_eq!(draft.polygon, zone.polygon);
    }

    #[test]
    fn hex_color_check() {
        assert!(is_hex_color("#a1B2c3"));
        assert!(!is_hex_color("a1B2c3"));
        assert!(!is_hex_color("#a1B2c"));
        assert!(!is_hex_color("#GGGGGG"));
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Storage codec for zone polygons.
//!
//! The document store behind the zone collection rejects arrays nested
//! inside arrays, so a polygon cannot be written as plain `GeoJSON`
//! coordinates. Every write therefore stores the polygon under several
//! keys:
//!
//! - `primaryCoordText`: the `GeoJSON` geometry serialized to a string.
//! - `secondaryCoordText`: an independent copy of the same string.
//! - `coordinateRings`: an array-free object form
//!   (`ring_N` → `point_M` → `{lng, lat}` with explicit counts).
//!
//! Reads walk a fixed priority chain over whatever forms a record has
//! (primary text, secondary text, object form, legacy embedded `GeoJSON`)
//! and take the first one that yields a valid polygon. If none does, the
//! record gets a fixed unit square and is marked degraded. Decoding never
//! fails, so one corrupt record cannot block loading a collection.

pub mod object_form;
pub mod record;
pub mod text;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use taxi_zones_geometry::{Polygon, close_ring, is_valid_polygon, unit_square};
use thiserror::Error;

pub use record::{decode_zone, encode_zone};

/// A raw stored record: an opaque JSON object.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Key holding the primary serialized polygon.
pub const PRIMARY_TEXT_KEY: &str = "primaryCoordText";
/// Key holding the backup copy of the serialized polygon.
pub const SECONDARY_TEXT_KEY: &str = "secondaryCoordText";
/// Key holding the array-free object form.
pub const OBJECT_FORM_KEY: &str = "coordinateRings";
/// Key of the `GeoJSON` geometry embedded directly by older records.
pub const LEGACY_KEY: &str = "coordinates";
/// Key recording which coordinate schema wrote the record.
pub const SCHEMA_VERSION_KEY: &str = "coordSchemaVersion";

/// Coordinate schema version written by this codec.
pub const CURRENT_SCHEMA_VERSION: u64 = 2;

/// Errors that can occur while encoding zones.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The polygon failed validation and cannot be encoded.
    #[error("Cannot encode an invalid polygon")]
    InvalidPolygon,

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which representations a write produces.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EncodingProfile {
    /// Primary text, secondary text and object form. Required by stores
    /// that reject nested arrays.
    #[default]
    Redundant,
    /// Primary text only, for stores without the nested-array limit.
    Canonical,
}

/// Where a decoded polygon came from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DecodeSource {
    /// `primaryCoordText`.
    PrimaryText,
    /// `secondaryCoordText`.
    SecondaryText,
    /// `coordinateRings`.
    ObjectForm,
    /// Legacy embedded `coordinates` geometry.
    Legacy,
    /// Nothing decoded; the unit square was substituted.
    Fallback,
}

/// A coordinate representation found on a stored record.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredGeometry<'a> {
    /// Serialized polygon under [`PRIMARY_TEXT_KEY`].
    PrimaryText(&'a str),
    /// Serialized polygon under [`SECONDARY_TEXT_KEY`].
    SecondaryText(&'a str),
    /// Array-free object under [`OBJECT_FORM_KEY`].
    ObjectForm(&'a serde_json::Map<String, serde_json::Value>),
    /// `GeoJSON` geometry object under [`LEGACY_KEY`].
    Legacy(&'a serde_json::Value),
}

impl StoredGeometry<'_> {
    /// The decode source this form maps to.
    #[must_use]
    pub const fn source(&self) -> DecodeSource {
        match self {
            Self::PrimaryText(_) => DecodeSource::PrimaryText,
            Self::SecondaryText(_) => DecodeSource::SecondaryText,
            Self::ObjectForm(_) => DecodeSource::ObjectForm,
            Self::Legacy(_) => DecodeSource::Legacy,
        }
    }

    /// Attempts to reconstruct a polygon from this form.
    ///
    /// Returns `None` if the form is unparseable or yields an invalid
    /// polygon. Rings are closed before validation.
    #[must_use]
    pub fn decode(&self) -> Option<Polygon> {
        let polygon = match self {
            Self::PrimaryText(s) | Self::SecondaryText(s) => text::parse_polygon_text(s),
            Self::ObjectForm(obj) => object_form::from_object(obj),
            Self::Legacy(value) => text::parse_legacy_geometry(value),
        }?;

        let polygon = Polygon {
            rings: polygon.rings.into_iter().map(close_ring).collect(),
        };

        is_valid_polygon(&polygon).then_some(polygon)
    }
}

/// Lists the coordinate forms present on a record, in decode priority
/// order.
///
/// Keys whose value has the wrong JSON type are skipped here; forms with
/// the right type but bad content are rejected later by
/// [`StoredGeometry::decode`].
#[must_use]
pub fn classify(record: &Record) -> Vec<StoredGeometry<'_>> {
    let mut forms = Vec::with_capacity(4);

    if let Some(s) = record.get(PRIMARY_TEXT_KEY).and_then(serde_json::Value::as_str) {
        forms.push(StoredGeometry::PrimaryText(s));
    }
    if let Some(s) = record
        .get(SECONDARY_TEXT_KEY)
        .and_then(serde_json::Value::as_str)
    {
        forms.push(StoredGeometry::SecondaryText(s));
    }
    if let Some(obj) = record
        .get(OBJECT_FORM_KEY)
        .and_then(serde_json::Value::as_object)
    {
        forms.push(StoredGeometry::ObjectForm(obj));
    }
    if let Some(value) = record.get(LEGACY_KEY).filter(|v| v.is_object()) {
        forms.push(StoredGeometry::Legacy(value));
    }

    forms
}

/// Result of decoding a record's coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPolygon {
    /// The recovered (or substituted) polygon. Always valid.
    pub polygon: Polygon,
    /// Which form produced it.
    pub source: DecodeSource,
}

impl DecodedPolygon {
    /// `true` when no stored form could be decoded.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.source == DecodeSource::Fallback
    }
}

/// Encodes a polygon into the coordinate keys of a record.
///
/// # Errors
///
/// * [`CodecError::InvalidPolygon`] if the polygon fails
///   [`is_valid_polygon`]
/// * [`CodecError::Json`] if serialization fails
pub fn encode_polygon(polygon: &Polygon, profile: EncodingProfile) -> Result<Record, CodecError> {
    if !is_valid_polygon(polygon) {
        return Err(CodecError::InvalidPolygon);
    }

    let polygon = Polygon::new(polygon.rings.clone());
    let serialized = text::to_polygon_text(&polygon)?;

    let mut record = Record::new();
    record.insert(
        SCHEMA_VERSION_KEY.to_string(),
        serde_json::Value::from(CURRENT_SCHEMA_VERSION),
    );

    match profile {
        EncodingProfile::Redundant => {
            record.insert(
                PRIMARY_TEXT_KEY.to_string(),
                serde_json::Value::String(serialized.clone()),
            );
            record.insert(
                SECONDARY_TEXT_KEY.to_string(),
                serde_json::Value::String(serialized),
            );
            record.insert(
                OBJECT_FORM_KEY.to_string(),
                serde_json::Value::Object(object_form::to_object(&polygon)),
            );
        }
        EncodingProfile::Canonical => {
            record.insert(
                PRIMARY_TEXT_KEY.to_string(),
                serde_json::Value::String(serialized),
            );
        }
    }

    Ok(record)
}

/// Decodes a record's coordinates through the fallback chain.
///
/// Never fails: if no form decodes, returns the unit square with
/// [`DecodeSource::Fallback`].
#[must_use]
pub fn decode_polygon(record: &Record) -> DecodedPolygon {
    for form in classify(record) {
        let source = form.source();
        if let Some(polygon) = form.decode() {
            log::trace!("decoded polygon from {source}");
            return DecodedPolygon { polygon, source };
        }
        log::debug!("stored {source} form did not decode to a valid polygon, trying next");
    }

    DecodedPolygon {
        polygon: unit_square(),
        source: DecodeSource::Fallback,
    }
}

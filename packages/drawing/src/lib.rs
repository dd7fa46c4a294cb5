#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Interactive zone drawing and editing.
//!
//! A [`DrawingSession`] owns one create/edit interaction. It is driven by
//! discrete draw-tool events and moves through
//! `Idle → Drawing → Editing ⇄ Selected`, ending either `Committed` (the
//! draft was handed to the repository) or `Discarded`. The map widget sits
//! behind the [`DrawTool`] trait and is told about every mode and shape
//! change.
//!
//! Sessions are plain owned values. There is no global "current session";
//! callers keep the session and pass it around by reference.

pub mod session;
pub mod tool;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use taxi_zones_geometry::Coordinate;
use taxi_zones_zone_models::ValidationError;
use thiserror::Error;

pub use session::{DrawingSession, PendingCommit, SessionToken};
pub use tool::{DrawEvent, DrawTool, HeadlessTool, ShapeStyle};

/// Where a drawing session currently is.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DrawingState {
    /// No active shape.
    Idle,
    /// Vertices are being appended to an open ring.
    Drawing,
    /// A closed shape whose vertices can be moved or deleted.
    Editing,
    /// A closed shape that is chosen but not being edited.
    Selected,
    /// The draft was persisted. Terminal.
    Committed,
    /// The session was cancelled. Terminal.
    Discarded,
}

impl DrawingState {
    /// Returns `true` for `Committed` and `Discarded`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Discarded)
    }
}

/// Session tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawingConfig {
    /// A new vertex this close (in degrees) to the first vertex closes the
    /// shape.
    pub snap_tolerance_deg: f64,
    /// Side length of the generated default square.
    pub default_side_km: f64,
    /// Center used for the default square when the map view has none.
    pub fallback_center: Coordinate,
}

impl Default for DrawingConfig {
    fn default() -> Self {
        Self {
            snap_tolerance_deg: 0.000_2,
            default_side_km: 1.5,
            fallback_center: Coordinate::new(-0.127_6, 51.507_2),
        }
    }
}

/// Errors that can occur while drawing or editing a zone.
#[derive(Debug, Error)]
pub enum DrawingError {
    /// The action is not allowed in the current state.
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        /// State the session was in.
        state: DrawingState,
        /// What was attempted.
        action: &'static str,
    },

    /// Completing or deleting would leave fewer than three vertices.
    #[error("A zone needs at least 3 distinct vertices, found {count}")]
    TooFewVertices {
        /// Distinct vertices the shape would have.
        count: usize,
    },

    /// A coordinate was NaN or infinite.
    #[error("Coordinate is not a finite number")]
    InvalidCoordinate,

    /// The mutation would produce an invalid polygon.
    #[error("Edit would produce an invalid polygon")]
    InvalidPolygon,

    /// A vertex index outside the ring.
    #[error("Vertex {index} out of range (shape has {len} vertices)")]
    VertexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of vertices.
        len: usize,
    },

    /// Cancelling would lose drawn work; call again with confirmation.
    #[error("Discarding unsaved vertices requires confirmation")]
    ConfirmationRequired,

    /// The draft failed validation on save.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A response arrived for a session that has already ended.
    #[error("Drawing session is no longer active")]
    StaleSession,

    /// The draw tool never became ready.
    #[error("Draw tool unavailable: {message}")]
    ToolUnavailable {
        /// Description of what went wrong.
        message: String,
    },
}

//! The map draw-tool collaborator.

use taxi_zones_geometry::{Coordinate, Polygon};
use taxi_zones_zone_models::ZoneId;

use crate::{DrawingError, DrawingState};

/// How the draw tool should render a shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeStyle {
    /// Outline and fill color (`#RRGGBB`).
    pub color: String,
    /// Fill opacity, 0.0–1.0.
    pub fill_opacity: f64,
    /// Whether vertex handles are shown.
    pub editable: bool,
}

impl ShapeStyle {
    /// Style for a shape in the given state.
    #[must_use]
    pub fn for_state(color: &str, state: DrawingState) -> Self {
        let editable = matches!(state, DrawingState::Drawing | DrawingState::Editing);
        Self {
            color: color.to_string(),
            fill_opacity: if editable { 0.35 } else { 0.2 },
            editable,
        }
    }
}

/// Events emitted by the draw tool.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawEvent {
    /// The user placed a vertex.
    VertexAdded(Coordinate),
    /// The tool closed the shape itself (double-click, finish button).
    ShapeCompleted(Polygon),
    /// A vertex handle was dragged.
    VertexMoved {
        /// Vertex index, excluding the closing duplicate.
        index: usize,
        /// New position.
        point: Coordinate,
    },
    /// A vertex was removed.
    VertexDeleted {
        /// Vertex index, excluding the closing duplicate.
        index: usize,
    },
    /// The selected shape changed; `None` means nothing is selected.
    SelectionChanged(Option<ZoneId>),
}

/// Map-side drawing widget.
///
/// Rendering calls are fire-and-forget. Readiness is signalled once
/// through [`DrawTool::wait_ready`] rather than polled.
#[async_trait::async_trait]
pub trait DrawTool: Send + Sync {
    /// Resolves once the widget can accept drawing commands.
    ///
    /// # Errors
    ///
    /// Returns [`DrawingError::ToolUnavailable`] if the widget failed to
    /// load.
    async fn wait_ready(&self) -> Result<(), DrawingError>;

    /// Draws or redraws the session's shape.
    fn render_polygon(&mut self, polygon: &Polygon, style: &ShapeStyle);

    /// Removes every shape from the map.
    fn clear_all(&mut self);

    /// Switches the widget's interaction mode.
    fn set_mode(&mut self, mode: DrawingState);
}

/// A draw tool that does nothing, for headless use (CLI, server-side
/// default-shape generation).
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessTool;

#[async_trait::async_trait]
impl DrawTool for HeadlessTool {
    async fn wait_ready(&self) -> Result<(), DrawingError> {
        Ok(())
    }

    fn render_polygon(&mut self, _polygon: &Polygon, _style: &ShapeStyle) {}

    fn clear_all(&mut self) {}

    fn set_mode(&mut self, _mode: DrawingState) {}
}

//! The drawing session state machine.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use taxi_zones_geometry::{
    Coordinate, Polygon, area_km2_for_storage, close_ring, default_square, distinct_vertex_count,
    is_valid_polygon, open_vertices,
};
use taxi_zones_zone_models::{Zone, ZoneDraft, ZoneId};

use crate::{DrawEvent, DrawTool, DrawingConfig, DrawingError, DrawingState, ShapeStyle};

/// Identifies one lifetime of a session.
///
/// Async callers capture a token before awaiting and check
/// [`SessionToken::is_current`] before applying the result. Once the
/// session is committed or discarded every outstanding token goes stale.
#[derive(Debug, Clone)]
pub struct SessionToken {
    generation: Arc<AtomicU64>,
    issued: u64,
}

impl SessionToken {
    /// Returns `true` while the session that issued this token is still
    /// open.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.generation.load(Ordering::Acquire) == self.issued
    }
}

/// A validated draft ready to be written, with the token that must still
/// be current when the write returns.
#[derive(Debug, Clone)]
pub struct PendingCommit {
    /// Snapshot of the draft at save time.
    pub draft: ZoneDraft,
    /// Token for [`DrawingSession::finish_commit`].
    pub token: SessionToken,
}

/// One create or edit interaction for a single zone.
#[derive(Debug)]
pub struct DrawingSession<T: DrawTool> {
    tool: T,
    config: DrawingConfig,
    state: DrawingState,
    draft: ZoneDraft,
    vertices: Vec<Coordinate>,
    area_km2: f64,
    dirty: bool,
    generation: Arc<AtomicU64>,
}

impl<T: DrawTool> DrawingSession<T> {
    /// Waits for the draw tool, then opens an idle session for a new zone.
    ///
    /// # Errors
    ///
    /// * If the draw tool fails to become ready
    pub async fn start(
        tool: T,
        draft: ZoneDraft,
        config: DrawingConfig,
    ) -> Result<Self, DrawingError> {
        tool.wait_ready().await?;
        Ok(Self::new(tool, draft, config))
    }

    /// Waits for the draw tool, then opens an existing zone in `Selected`.
    ///
    /// # Errors
    ///
    /// * If the draw tool fails to become ready
    pub async fn open(tool: T, zone: &Zone, config: DrawingConfig) -> Result<Self, DrawingError> {
        tool.wait_ready().await?;

        let mut session = Self::new(tool, ZoneDraft::from_zone(zone), config);
        session.area_km2 = area_km2_for_storage(&zone.polygon);
        session.transition(DrawingState::Selected);
        session.render();
        log::debug!("Opened zone {} for editing", zone.id);
        Ok(session)
    }

    /// Creates an idle session around a tool that is already ready.
    #[must_use]
    pub fn new(tool: T, draft: ZoneDraft, config: DrawingConfig) -> Self {
        Self {
            tool,
            config,
            state: DrawingState::Idle,
            draft,
            vertices: Vec::new(),
            area_km2: 0.0,
            dirty: false,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    #[must_use]
    pub const fn state(&self) -> DrawingState {
        self.state
    }

    #[must_use]
    pub const fn draft(&self) -> &ZoneDraft {
        &self.draft
    }

    #[must_use]
    pub const fn config(&self) -> &DrawingConfig {
        &self.config
    }

    #[must_use]
    pub const fn tool(&self) -> &T {
        &self.tool
    }

    /// Area of the closed shape in km², 4 decimal places. `0.0` until a
    /// shape is completed.
    #[must_use]
    pub const fn area_km2(&self) -> f64 {
        self.area_km2
    }

    /// The vertices the user is working with: the open ring while
    /// drawing, the outer ring without its closing duplicate otherwise.
    #[must_use]
    pub fn vertices(&self) -> &[Coordinate] {
        match self.state {
            DrawingState::Drawing => &self.vertices,
            _ => self
                .draft
                .polygon
                .outer()
                .map(|ring| open_vertices(ring))
                .unwrap_or_default(),
        }
    }

    /// Returns `true` if cancelling would lose drawn or edited work.
    #[must_use]
    pub const fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    /// A token for the session's current lifetime.
    #[must_use]
    pub fn token(&self) -> SessionToken {
        SessionToken {
            generation: Arc::clone(&self.generation),
            issued: self.generation.load(Ordering::Acquire),
        }
    }

    /// `Idle → Drawing`.
    ///
    /// # Errors
    ///
    /// * [`DrawingError::InvalidTransition`] outside `Idle`
    pub fn start_drawing(&mut self) -> Result<DrawingState, DrawingError> {
        self.require(&[DrawingState::Idle], "start drawing")?;
        self.vertices.clear();
        self.tool.clear_all();
        self.transition(DrawingState::Drawing);
        Ok(self.state)
    }

    /// Appends a vertex to the open ring.
    ///
    /// A vertex within the snap tolerance of the first vertex completes the
    /// shape instead of being appended, once three distinct vertices exist.
    ///
    /// # Errors
    ///
    /// * [`DrawingError::InvalidTransition`] outside `Drawing`
    /// * [`DrawingError::InvalidCoordinate`] for a non-finite point
    pub fn add_vertex(&mut self, point: Coordinate) -> Result<DrawingState, DrawingError> {
        self.require(&[DrawingState::Drawing], "add a vertex")?;
        if !point.is_finite() {
            return Err(DrawingError::InvalidCoordinate);
        }

        if let Some(first) = self.vertices.first()
            && distinct_vertex_count(&self.vertices) >= 3
            && (point.lng - first.lng).hypot(point.lat - first.lat)
                <= self.config.snap_tolerance_deg
        {
            log::debug!("Vertex snapped to the first vertex, closing shape");
            return self.complete();
        }

        self.vertices.push(point);
        self.dirty = true;
        self.render();
        Ok(self.state)
    }

    /// `Drawing → Editing`: closes the ring and computes its area.
    ///
    /// # Errors
    ///
    /// * [`DrawingError::InvalidTransition`] outside `Drawing`
    /// * [`DrawingError::TooFewVertices`] with fewer than three distinct
    ///   vertices; the session stays in `Drawing`
    pub fn complete(&mut self) -> Result<DrawingState, DrawingError> {
        self.require(&[DrawingState::Drawing], "complete the shape")?;
        self.close_shape(self.vertices.clone())
    }

    fn close_shape(&mut self, vertices: Vec<Coordinate>) -> Result<DrawingState, DrawingError> {
        let count = distinct_vertex_count(&vertices);
        if count < 3 {
            return Err(DrawingError::TooFewVertices { count });
        }

        let polygon = Polygon::from_outer(vertices);
        if !is_valid_polygon(&polygon) {
            return Err(DrawingError::InvalidPolygon);
        }

        self.vertices.clear();
        self.transition(DrawingState::Editing);
        self.apply_shape(polygon);
        log::info!(
            "Completed shape with {count} vertices ({} km²)",
            self.area_km2
        );
        Ok(self.state)
    }

    /// `Idle`/`Drawing → Editing` with a default square around `center`,
    /// or around the configured fallback center when none is given.
    ///
    /// # Errors
    ///
    /// * [`DrawingError::InvalidTransition`] outside `Idle` and `Drawing`
    pub fn generate_default_shape(
        &mut self,
        center: Option<Coordinate>,
    ) -> Result<DrawingState, DrawingError> {
        self.require(
            &[DrawingState::Idle, DrawingState::Drawing],
            "generate a default shape",
        )?;

        let center = center
            .filter(Coordinate::is_finite)
            .unwrap_or(self.config.fallback_center);
        let polygon = default_square(center, self.config.default_side_km);

        self.vertices.clear();
        self.transition(DrawingState::Editing);
        self.apply_shape(polygon);
        Ok(self.state)
    }

    /// Moves the vertex at `index`. Moving vertex 0 also moves the closing
    /// coordinate.
    ///
    /// # Errors
    ///
    /// * [`DrawingError::InvalidTransition`] outside `Editing`
    /// * [`DrawingError::VertexOutOfRange`] for a bad index
    /// * [`DrawingError::InvalidPolygon`] if the result would be invalid,
    ///   or if the first and last vertices would coincide and merge into
    ///   the closing coordinate; the ring is left unchanged
    pub fn move_vertex(
        &mut self,
        index: usize,
        point: Coordinate,
    ) -> Result<DrawingState, DrawingError> {
        self.edit_ring("move a vertex", |ring| {
            let len = ring.len();
            let vertex = ring
                .get_mut(index)
                .ok_or(DrawingError::VertexOutOfRange { index, len })?;
            *vertex = point;
            if len > 1 && ring.first() == ring.last() {
                return Err(DrawingError::InvalidPolygon);
            }
            Ok(())
        })
    }

    /// Deletes the vertex at `index`.
    ///
    /// # Errors
    ///
    /// * [`DrawingError::InvalidTransition`] outside `Editing`
    /// * [`DrawingError::VertexOutOfRange`] for a bad index
    /// * [`DrawingError::TooFewVertices`] if fewer than three distinct
    ///   vertices would remain
    pub fn delete_vertex(&mut self, index: usize) -> Result<DrawingState, DrawingError> {
        self.edit_ring("delete a vertex", |ring| {
            if index >= ring.len() {
                return Err(DrawingError::VertexOutOfRange {
                    index,
                    len: ring.len(),
                });
            }
            ring.remove(index);
            let count = distinct_vertex_count(ring);
            if count < 3 {
                return Err(DrawingError::TooFewVertices { count });
            }
            Ok(())
        })
    }

    /// `Editing → Selected`.
    ///
    /// # Errors
    ///
    /// * [`DrawingError::InvalidTransition`] outside `Editing`
    pub fn deselect(&mut self) -> Result<DrawingState, DrawingError> {
        self.require(&[DrawingState::Editing], "deselect")?;
        self.transition(DrawingState::Selected);
        self.render();
        Ok(self.state)
    }

    /// `Selected → Editing`.
    ///
    /// # Errors
    ///
    /// * [`DrawingError::InvalidTransition`] outside `Selected`
    pub fn edit(&mut self) -> Result<DrawingState, DrawingError> {
        self.require(&[DrawingState::Selected], "edit")?;
        self.transition(DrawingState::Editing);
        self.render();
        Ok(self.state)
    }

    /// Renames the draft.
    ///
    /// # Errors
    ///
    /// * [`DrawingError::InvalidTransition`] once the session has ended
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), DrawingError> {
        self.require_open("rename")?;
        self.draft.name = name.into();
        self.dirty = true;
        Ok(())
    }

    /// Replaces the draft's description.
    ///
    /// # Errors
    ///
    /// * [`DrawingError::InvalidTransition`] once the session has ended
    pub fn set_description(&mut self, description: impl Into<String>) -> Result<(), DrawingError> {
        self.require_open("edit the description")?;
        self.draft.description = description.into();
        self.dirty = true;
        Ok(())
    }

    /// Links a fare rule and sets the zone surcharge.
    ///
    /// # Errors
    ///
    /// * [`DrawingError::InvalidTransition`] once the session has ended
    pub fn set_pricing(
        &mut self,
        fare_rule_id: Option<String>,
        surcharge_multiplier: Option<f64>,
    ) -> Result<(), DrawingError> {
        self.require_open("edit pricing")?;
        self.draft.fare_rule_id = fare_rule_id;
        self.draft.surcharge_multiplier = surcharge_multiplier;
        self.dirty = true;
        Ok(())
    }

    /// Discards the session. An `Idle` session has nothing to discard.
    ///
    /// With unsaved work the first call returns
    /// [`DrawingError::ConfirmationRequired`] and changes nothing; pass
    /// `confirmed = true` to discard anyway.
    ///
    /// # Errors
    ///
    /// * [`DrawingError::ConfirmationRequired`] as above
    /// * [`DrawingError::InvalidTransition`] from `Idle` or once the
    ///   session has ended
    pub fn cancel(&mut self, confirmed: bool) -> Result<DrawingState, DrawingError> {
        self.require(
            &[
                DrawingState::Drawing,
                DrawingState::Editing,
                DrawingState::Selected,
            ],
            "cancel",
        )?;
        if self.dirty && !confirmed {
            return Err(DrawingError::ConfirmationRequired);
        }

        self.vertices.clear();
        self.dirty = false;
        self.end(DrawingState::Discarded);
        log::debug!("Drawing session for {} discarded", self.draft.id);
        Ok(self.state)
    }

    /// Validates the draft and snapshots it for writing.
    ///
    /// # Errors
    ///
    /// * [`DrawingError::InvalidTransition`] outside `Editing` and
    ///   `Selected`
    /// * [`DrawingError::Validation`] if the name or shape is invalid; the
    ///   session is unchanged
    pub fn prepare_commit(&self) -> Result<PendingCommit, DrawingError> {
        self.require(&[DrawingState::Editing, DrawingState::Selected], "save")?;
        self.draft.validate()?;
        Ok(PendingCommit {
            draft: self.draft.clone(),
            token: self.token(),
        })
    }

    /// Marks the session `Committed` after a successful write.
    ///
    /// # Errors
    ///
    /// * [`DrawingError::StaleSession`] if the session ended while the
    ///   write was in flight; nothing is changed
    pub fn finish_commit(
        &mut self,
        token: &SessionToken,
        zone_id: ZoneId,
    ) -> Result<DrawingState, DrawingError> {
        if !token.is_current() || self.state.is_terminal() {
            return Err(DrawingError::StaleSession);
        }

        log::info!("Committed zone {zone_id}");
        self.draft.id = zone_id;
        self.dirty = false;
        self.end(DrawingState::Committed);
        Ok(self.state)
    }

    /// Dispatches an event from the draw tool.
    ///
    /// Selection changes that do not apply to the current state are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Whatever the corresponding operation returns.
    pub fn handle_event(&mut self, event: DrawEvent) -> Result<DrawingState, DrawingError> {
        match event {
            DrawEvent::VertexAdded(point) => self.add_vertex(point),
            DrawEvent::ShapeCompleted(polygon) => {
                self.require(&[DrawingState::Drawing], "complete the shape")?;
                let vertices = polygon
                    .outer()
                    .map(|outer| open_vertices(outer).to_vec())
                    .unwrap_or_default();
                self.close_shape(vertices)
            }
            DrawEvent::VertexMoved { index, point } => self.move_vertex(index, point),
            DrawEvent::VertexDeleted { index } => self.delete_vertex(index),
            DrawEvent::SelectionChanged(selected) => match (self.state, selected) {
                (DrawingState::Selected, Some(id)) if id == self.draft.id => self.edit(),
                (DrawingState::Editing, None) => self.deselect(),
                (DrawingState::Editing, Some(id)) if id != self.draft.id => self.deselect(),
                _ => Ok(self.state),
            },
        }
    }

    fn edit_ring(
        &mut self,
        action: &'static str,
        mutate: impl FnOnce(&mut Vec<Coordinate>) -> Result<(), DrawingError>,
    ) -> Result<DrawingState, DrawingError> {
        self.require(&[DrawingState::Editing], action)?;

        let mut ring = self.vertices().to_vec();
        mutate(&mut ring)?;

        let mut rings = self.draft.polygon.rings.clone();
        match rings.first_mut() {
            Some(outer) => *outer = close_ring(ring),
            None => rings.push(close_ring(ring)),
        }
        let candidate = Polygon { rings };
        if !is_valid_polygon(&candidate) {
            return Err(DrawingError::InvalidPolygon);
        }

        self.apply_shape(candidate);
        Ok(self.state)
    }

    fn apply_shape(&mut self, polygon: Polygon) {
        self.area_km2 = area_km2_for_storage(&polygon);
        self.draft.polygon = polygon;
        self.dirty = true;
        self.render();
    }

    fn render(&mut self) {
        let style = ShapeStyle::for_state(&self.draft.color, self.state);
        if self.state == DrawingState::Drawing {
            let open = Polygon {
                rings: vec![self.vertices.clone()],
            };
            self.tool.render_polygon(&open, &style);
        } else if !self.draft.polygon.is_empty() {
            self.tool.render_polygon(&self.draft.polygon, &style);
        }
    }

    fn transition(&mut self, next: DrawingState) {
        log::debug!("Drawing session {} -> {next}", self.state);
        self.state = next;
        self.tool.set_mode(next);
    }

    fn end(&mut self, outcome: DrawingState) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.tool.clear_all();
        self.transition(outcome);
    }

    fn require(
        &self,
        allowed: &[DrawingState],
        action: &'static str,
    ) -> Result<(), DrawingError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(DrawingError::InvalidTransition {
                state: self.state,
                action,
            })
        }
    }

    fn require_open(&self, action: &'static str) -> Result<(), DrawingError> {
        if self.state.is_terminal() {
            Err(DrawingError::InvalidTransition {
                state: self.state,
                action,
            })
        } else {
            Ok(())
        }
    }
}

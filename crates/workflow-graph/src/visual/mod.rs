//! Visual graph adapter
//!
//! Wraps the canvas cell model and turns its generic cell events into typed
//! operator and link events. It also owns the presentation-only state that
//! has no counterpart in the semantic graph:
//!
//! - **Highlight**: at most one operator is highlighted at a time
//! - **Viewport**: zoom ratio and pan offset, resettable to defaults
//!
//! Every change is published as a [`VisualEvent`] and forwarded to the
//! [`CanvasRenderer`] as a [`CanvasCommand`].

pub mod canvas;
pub mod renderer;

use crate::constants::viewport;
use crate::error::{GraphError, Result};
use crate::events::{EventChannel, EventStream, VisualEvent};
use crate::types::{Link, OperatorId, Point};

pub use canvas::{CanvasModel, Cell, CellEvent};
pub use renderer::{CanvasCommand, CanvasRenderer, NullRenderer, RecordingRenderer};

/// Canvas-side mirror of the workflow graph
pub struct VisualGraphAdapter {
    model: CanvasModel,
    renderer: Box<dyn CanvasRenderer>,
    highlighted: Option<OperatorId>,
    zoom_ratio: f64,
    pan_offset: Point,
    events: EventChannel<VisualEvent>,
}

impl VisualGraphAdapter {
    /// Create an adapter that draws nowhere
    pub fn new() -> Self {
        Self::with_renderer(Box::new(NullRenderer))
    }

    pub fn with_renderer(renderer: Box<dyn CanvasRenderer>) -> Self {
        Self {
            model: CanvasModel::new(),
            renderer,
            highlighted: None,
            zoom_ratio: viewport::INIT_ZOOM_VALUE,
            pan_offset: viewport::INIT_PAN_OFFSET.into(),
            events: EventChannel::new(),
        }
    }

    /// Draw through a new renderer
    ///
    /// The current canvas is redrawn on it: elements, then links (each
    /// sorted by ID), then the viewport and the highlight. Cells,
    /// subscribers and presentation state are kept.
    pub fn set_renderer(&mut self, renderer: Box<dyn CanvasRenderer>) {
        self.renderer = renderer;

        let mut cells: Vec<&Cell> = self.model.cells().collect();
        cells.sort_by(|a, b| (!a.is_element(), a.id()).cmp(&(!b.is_element(), b.id())));

        let mut commands: Vec<CanvasCommand> = cells
            .into_iter()
            .map(|cell| match cell {
                Cell::Element { id, position } => CanvasCommand::AddElement {
                    operator_id: id.clone(),
                    position: *position,
                },
                Cell::Link { link } => CanvasCommand::AddLink { link: link.clone() },
            })
            .collect();
        commands.push(CanvasCommand::SetScale {
            ratio: self.zoom_ratio,
        });
        commands.push(CanvasCommand::SetTranslate {
            offset: self.pan_offset,
        });
        if let Some(operator_id) = &self.highlighted {
            commands.push(CanvasCommand::Highlight {
                operator_id: operator_id.clone(),
            });
        }

        log::debug!("Redrawing {} canvas commands on new renderer", commands.len());
        for command in commands {
            self.renderer.apply(command);
        }
    }

    pub fn subscribe(&self) -> EventStream<VisualEvent, VisualEvent> {
        self.events.subscribe()
    }

    pub fn subscribe_filtered<T>(&self, select: fn(VisualEvent) -> Option<T>) -> EventStream<VisualEvent, T> {
        self.events.subscribe_filtered(select)
    }

    // ---- cells ----

    pub fn has_operator_element(&self, operator_id: &str) -> bool {
        matches!(self.model.cell(operator_id), Some(Cell::Element { .. }))
    }

    pub fn has_link_cell(&self, link_id: &str) -> bool {
        matches!(self.model.cell(link_id), Some(Cell::Link { .. }))
    }

    pub fn cell_count(&self) -> usize {
        self.model.len()
    }

    pub fn add_operator_element(&mut self, operator_id: &str, position: Point) -> Result<()> {
        let event = self.model.add_cell(Cell::Element {
            id: operator_id.to_string(),
            position,
        })?;
        self.dispatch(event);
        Ok(())
    }

    pub fn add_link_cell(&mut self, link: Link) -> Result<()> {
        let event = self.model.add_cell(Cell::Link { link })?;
        self.dispatch(event);
        Ok(())
    }

    /// Remove a cell the way the canvas does natively
    ///
    /// Removing an operator also removes its attached links. If the operator
    /// is highlighted, `Unhighlighted` is published before any deletion.
    /// Returns the raw cell events in removal order.
    pub fn remove_cell(&mut self, cell_id: &str) -> Result<Vec<CellEvent>> {
        let is_element = self
            .model
            .cell(cell_id)
            .ok_or_else(|| GraphError::CellNotFound(cell_id.to_string()))?
            .is_element();

        if is_element && self.highlighted.as_deref() == Some(cell_id) {
            self.unhighlight_current();
        }

        let removed = self.model.remove_cell(cell_id)?;
        for event in &removed {
            self.dispatch(event.clone());
        }
        Ok(removed)
    }

    pub fn operator_position(&self, operator_id: &str) -> Result<Point> {
        match self.model.cell(operator_id) {
            Some(Cell::Element { position, .. }) => Ok(*position),
            Some(Cell::Link { .. }) => Err(GraphError::NotAnOperator(operator_id.to_string())),
            None => Err(GraphError::OperatorNotFound(operator_id.to_string())),
        }
    }

    /// Move an operator element (drag)
    pub fn set_operator_position(&mut self, operator_id: &str, position: Point) -> Result<()> {
        self.operator_position(operator_id)?;
        let event = self.model.move_element(operator_id, position)?;
        self.dispatch(event);
        Ok(())
    }

    /// Apply validation styling to an operator element
    pub fn set_operator_validity(&mut self, operator_id: &str, valid: bool) -> Result<()> {
        self.operator_position(operator_id)?;
        self.renderer.apply(CanvasCommand::SetValidity {
            operator_id: operator_id.to_string(),
            valid,
        });
        Ok(())
    }

    /// Narrow a generic cell event into operator/link events
    fn dispatch(&mut self, event: CellEvent) {
        let (visual, command) = match event {
            CellEvent::Added(Cell::Element { id, position }) => (
                VisualEvent::OperatorCellAdded {
                    operator_id: id.clone(),
                    position,
                },
                CanvasCommand::AddElement {
                    operator_id: id,
                    position,
                },
            ),
            CellEvent::Added(Cell::Link { link }) => (
                VisualEvent::LinkCellAdded { link: link.clone() },
                CanvasCommand::AddLink { link },
            ),
            CellEvent::Removed(Cell::Element { id, .. }) => (
                VisualEvent::OperatorCellDeleted {
                    operator_id: id.clone(),
                },
                CanvasCommand::RemoveCell { cell_id: id },
            ),
            CellEvent::Removed(Cell::Link { link }) => {
                let cell_id = link.link_id.clone();
                (
                    VisualEvent::LinkCellDeleted { link },
                    CanvasCommand::RemoveCell { cell_id },
                )
            }
            CellEvent::Moved { id, position } => (
                VisualEvent::OperatorMoved {
                    operator_id: id.clone(),
                    position,
                },
                CanvasCommand::MoveElement {
                    operator_id: id,
                    position,
                },
            ),
        };
        self.renderer.apply(command);
        self.events.emit(visual);
    }

    // ---- highlight ----

    pub fn current_highlighted(&self) -> Option<&str> {
        self.highlighted.as_deref()
    }

    /// Highlight an operator, unhighlighting the previous one
    ///
    /// Highlighting the operator that is already highlighted does nothing.
    pub fn highlight_operator(&mut self, operator_id: &str) -> Result<()> {
        self.operator_position(operator_id)?;
        if self.highlighted.as_deref() == Some(operator_id) {
            return Ok(());
        }

        self.unhighlight_current();
        self.highlighted = Some(operator_id.to_string());
        self.renderer.apply(CanvasCommand::Highlight {
            operator_id: operator_id.to_string(),
        });
        self.events.emit(VisualEvent::Highlighted {
            operator_id: operator_id.to_string(),
        });
        Ok(())
    }

    /// Clear the highlight; no-op when nothing is highlighted
    pub fn unhighlight_current(&mut self) {
        if let Some(operator_id) = self.highlighted.take() {
            self.renderer.apply(CanvasCommand::Unhighlight {
                operator_id: operator_id.clone(),
            });
            self.events.emit(VisualEvent::Unhighlighted { operator_id });
        }
    }

    // ---- viewport ----

    pub fn zoom_ratio(&self) -> f64 {
        self.zoom_ratio
    }

    pub fn panning_offset(&self) -> Point {
        self.pan_offset
    }

    pub fn set_zoom_property(&mut self, ratio: f64) -> Result<()> {
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(GraphError::InvalidZoom(ratio));
        }
        self.zoom_ratio = ratio;
        self.renderer.apply(CanvasCommand::SetScale { ratio });
        self.events.emit(VisualEvent::ZoomChanged { ratio });
        Ok(())
    }

    pub fn set_panning_offset(&mut self, offset: Point) {
        self.pan_offset = offset;
        self.renderer.apply(CanvasCommand::SetTranslate { offset });
        self.events.emit(VisualEvent::PanChanged { offset });
    }

    /// Reset zoom and pan to their defaults with a single event
    pub fn restore_default_zoom_and_offset(&mut self) {
        self.zoom_ratio = viewport::INIT_ZOOM_VALUE;
        self.pan_offset = viewport::INIT_PAN_OFFSET.into();
        self.renderer.apply(CanvasCommand::SetScale {
            ratio: self.zoom_ratio,
        });
        self.renderer.apply(CanvasCommand::SetTranslate {
            offset: self.pan_offset,
        });
        self.events.emit(VisualEvent::ViewportRestored {
            zoom: self.zoom_ratio,
            offset: self.pan_offset,
        });
    }
}

impl Default for VisualGraphAdapter {
    fn default() -> Self {
        Self::new()
    }
}

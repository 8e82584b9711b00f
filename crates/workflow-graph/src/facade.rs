//! Graph action facade
//!
//! The single mutation entry point for the workflow editor. Every mutator
//! applies the semantic-graph step first and the canvas step second; when
//! the semantic step or any precondition fails, nothing has been changed.
//! After each mutation the facade:
//!
//! 1. re-runs validation for the operators the mutation touched
//! 2. records an undo snapshot
//!
//! The semantic graph is the source of truth. The canvas is only changed
//! independently for presentation state (highlight, zoom, pan), and
//! canvas-originated deletions are mirrored back through
//! [`GraphActionFacade::remove_cell_from_canvas`].

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::error::{GraphError, Result};
use crate::events::{EventChannel, EventStream, GraphEvent, ValidationEvent, VisualEvent};
use crate::graph::WorkflowGraph;
use crate::schema::SchemaCatalog;
use crate::types::{Link, LinkEndpoint, Operator, OperatorId, Point, PropertyBag};
use crate::undo::{GraphSnapshot, UndoStack};
use crate::validation::{OperatorValidator, SchemaValidator};
use crate::visual::{CanvasRenderer, Cell, CellEvent, VisualGraphAdapter};

/// Keeps the workflow graph and its canvas mirror in step
pub struct GraphActionFacade {
    catalog: Arc<SchemaCatalog>,
    graph: WorkflowGraph,
    visual: VisualGraphAdapter,
    validator: Arc<dyn OperatorValidator>,
    validity: HashMap<OperatorId, bool>,
    validation_events: EventChannel<ValidationEvent>,
    history: UndoStack,
    replaying: bool,
}

impl GraphActionFacade {
    /// Create a facade with schema validation and no renderer
    pub fn new(catalog: Arc<SchemaCatalog>) -> Self {
        let validator = Arc::new(SchemaValidator::new(catalog.clone()));
        let mut facade = Self {
            catalog,
            graph: WorkflowGraph::new(),
            visual: VisualGraphAdapter::new(),
            validator,
            validity: HashMap::new(),
            validation_events: EventChannel::new(),
            history: UndoStack::default(),
            replaying: false,
        };
        facade.record();
        facade
    }

    /// Draw through the given renderer
    pub fn with_renderer(mut self, renderer: Box<dyn CanvasRenderer>) -> Self {
        self.set_renderer(renderer);
        self
    }

    /// Switch to another renderer, redrawing the workflow and its
    /// validation styling on it
    pub fn set_renderer(&mut self, renderer: Box<dyn CanvasRenderer>) {
        self.visual.set_renderer(renderer);

        let mut validity: Vec<(&OperatorId, &bool)> = self.validity.iter().collect();
        validity.sort();
        for (operator_id, valid) in validity {
            if let Err(e) = self.visual.set_operator_validity(operator_id, *valid) {
                log::warn!("No canvas element to style for {}: {}", operator_id, e);
            }
        }
    }

    /// Replace the operator validator
    pub fn with_validator(mut self, validator: Arc<dyn OperatorValidator>) -> Self {
        self.validator = validator;
        self
    }

    // ---- read access ----

    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    pub fn visual(&self) -> &VisualGraphAdapter {
        &self.visual
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// Last validation result of an operator
    pub fn operator_validity(&self, operator_id: &str) -> Option<bool> {
        self.validity.get(operator_id).copied()
    }

    /// Current graph and positions as a snapshot
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot::capture(&self.graph, &self.visual)
    }

    // ---- streams ----

    pub fn graph_events(&self) -> EventStream<GraphEvent, GraphEvent> {
        self.graph.subscribe()
    }

    pub fn visual_events(&self) -> EventStream<VisualEvent, VisualEvent> {
        self.visual.subscribe()
    }

    pub fn validation_events(&self) -> EventStream<ValidationEvent, ValidationEvent> {
        self.validation_events.subscribe()
    }

    pub fn operator_delete_stream(&self) -> EventStream<GraphEvent, Operator> {
        self.graph.subscribe_filtered(GraphEvent::deleted_operator)
    }

    pub fn link_delete_stream(&self) -> EventStream<GraphEvent, Link> {
        self.graph.subscribe_filtered(GraphEvent::deleted_link)
    }

    pub fn property_change_stream(&self) -> EventStream<GraphEvent, (Operator, Operator)> {
        self.graph.subscribe_filtered(GraphEvent::property_change)
    }

    pub fn highlight_stream(&self) -> EventStream<VisualEvent, OperatorId> {
        self.visual.subscribe_filtered(VisualEvent::highlighted)
    }

    pub fn unhighlight_stream(&self) -> EventStream<VisualEvent, OperatorId> {
        self.visual.subscribe_filtered(VisualEvent::unhighlighted)
    }

    pub fn zoom_stream(&self) -> EventStream<VisualEvent, f64> {
        self.visual.subscribe_filtered(VisualEvent::zoom)
    }

    pub fn restore_stream(&self) -> EventStream<VisualEvent, (f64, Point)> {
        self.visual.subscribe_filtered(VisualEvent::restored)
    }

    // ---- factories ----

    /// A new operator of `operator_type` with generated ID and ports
    pub fn create_operator(&self, operator_type: &str) -> Result<Operator> {
        self.catalog.new_operator(operator_type)
    }

    /// A new link with a generated `link-<uuid>` ID
    pub fn create_link(&self, source: LinkEndpoint, target: LinkEndpoint) -> Link {
        Link::new(
            format!("{}{}", crate::constants::ids::LINK_PREFIX, uuid::Uuid::new_v4()),
            source,
            target,
        )
    }

    // ---- graph mutations ----

    pub fn add_operator(&mut self, operator: Operator, position: Point) -> Result<()> {
        self.catalog.check_operator(&operator)?;
        self.graph.check_add_operator(&operator)?;
        if self.visual.has_operator_element(&operator.operator_id)
            || self.visual.has_link_cell(&operator.operator_id)
        {
            return Err(GraphError::DuplicateCell(operator.operator_id));
        }

        let operator_id = operator.operator_id.clone();
        self.graph.add_operator(operator)?;
        self.visual.add_operator_element(&operator_id, position)?;

        self.revalidate([operator_id]);
        self.record();
        Ok(())
    }

    /// Delete an operator together with its links
    pub fn delete_operator(&mut self, operator_id: &str) -> Result<()> {
        let neighbors = self.graph.connected_operators(operator_id)?;

        self.graph.delete_operator(operator_id)?;
        self.visual.remove_cell(operator_id)?;
        self.validity.remove(operator_id);

        self.revalidate(neighbors);
        self.record();
        Ok(())
    }

    pub fn add_link(&mut self, link: Link) -> Result<()> {
        self.graph.check_add_link(&link)?;
        if self.visual.has_operator_element(&link.link_id) || self.visual.has_link_cell(&link.link_id) {
            return Err(GraphError::DuplicateCell(link.link_id));
        }

        let affected = [link.source.operator_id.clone(), link.target.operator_id.clone()];
        self.graph.add_link(link.clone())?;
        self.visual.add_link_cell(link)?;

        self.revalidate(affected);
        self.record();
        Ok(())
    }

    pub fn delete_link(&mut self, link_id: &str) -> Result<()> {
        let link = self.graph.delete_link(link_id)?;
        self.visual.remove_cell(link_id)?;

        self.revalidate([link.source.operator_id, link.target.operator_id]);
        self.record();
        Ok(())
    }

    /// Replace an operator's properties
    ///
    /// Returns whether anything changed; equal properties emit nothing.
    pub fn set_operator_property(&mut self, operator_id: &str, properties: PropertyBag) -> Result<bool> {
        let changed = self.graph.set_operator_property(operator_id, properties)?;
        if changed {
            self.revalidate([operator_id.to_string()]);
            self.record();
        }
        Ok(changed)
    }

    pub fn set_operator_advanced(&mut self, operator_id: &str, show_advanced: bool) -> Result<bool> {
        let changed = self.graph.set_operator_advanced(operator_id, show_advanced)?;
        if changed {
            self.record();
        }
        Ok(changed)
    }

    /// Mirror a deletion the user made directly on the canvas
    ///
    /// The canvas removes the cell (and, for operators, attached links);
    /// each removal is then applied to the semantic graph in the same order.
    pub fn remove_cell_from_canvas(&mut self, cell_id: &str) -> Result<()> {
        let removed = self.visual.remove_cell(cell_id)?;

        let mut affected = BTreeSet::new();
        let mut deleted = BTreeSet::new();
        for event in removed {
            let CellEvent::Removed(cell) = event else {
                continue;
            };
            match cell {
                Cell::Link { link } => {
                    self.graph.delete_link(&link.link_id).map_err(|e| {
                        log::error!("Canvas removed link {} unknown to the graph", link.link_id);
                        e
                    })?;
                    affected.insert(link.source.operator_id);
                    affected.insert(link.target.operator_id);
                }
                Cell::Element { id, .. } => {
                    self.graph.delete_operator(&id).map_err(|e| {
                        log::error!("Canvas removed operator {} unknown to the graph", id);
                        e
                    })?;
                    self.validity.remove(&id);
                    deleted.insert(id);
                }
            }
        }

        self.revalidate(affected.into_iter().filter(|id| !deleted.contains(id)));
        self.record();
        Ok(())
    }

    // ---- presentation state ----

    /// Move an operator; moving it to where it already is records nothing
    pub fn set_operator_position(&mut self, operator_id: &str, position: Point) -> Result<()> {
        self.graph.operator(operator_id)?;
        if self.visual.operator_position(operator_id)? == position {
            return Ok(());
        }
        self.visual.set_operator_position(operator_id, position)?;
        self.record();
        Ok(())
    }

    pub fn highlight_operator(&mut self, operator_id: &str) -> Result<()> {
        self.visual.highlight_operator(operator_id)
    }

    pub fn unhighlight_current(&mut self) {
        self.visual.unhighlight_current()
    }

    pub fn set_zoom_property(&mut self, ratio: f64) -> Result<()> {
        self.visual.set_zoom_property(ratio)
    }

    pub fn set_panning_offset(&mut self, offset: Point) {
        self.visual.set_panning_offset(offset)
    }

    pub fn restore_default_zoom_and_offset(&mut self) {
        self.visual.restore_default_zoom_and_offset()
    }

    // ---- validation ----

    /// Validate every operator; true when all pass
    pub fn validate_workflow(&mut self) -> bool {
        let ids: Vec<OperatorId> = self.graph.operators().map(|op| op.operator_id.clone()).collect();
        self.revalidate(ids);
        self.validity.values().all(|valid| *valid)
    }

    fn revalidate(&mut self, operator_ids: impl IntoIterator<Item = OperatorId>) {
        let ids: BTreeSet<OperatorId> = operator_ids.into_iter().collect();
        for operator_id in ids {
            let Ok(operator) = self.graph.operator(&operator_id) else {
                continue;
            };
            let valid = self.validator.validate(operator, &self.graph);
            self.validity.insert(operator_id.clone(), valid);
            if let Err(e) = self.visual.set_operator_validity(&operator_id, valid) {
                log::warn!("No canvas element to style for {}: {}", operator_id, e);
            }
            self.validation_events.emit(ValidationEvent { operator_id, valid });
        }
    }

    // ---- undo/redo ----

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Step back one mutation; false when there is nothing to undo
    pub fn undo(&mut self) -> Result<bool> {
        match self.history.undo() {
            Some(snapshot) => {
                self.restore(&snapshot?)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Re-apply an undone mutation; false when there is nothing to redo
    pub fn redo(&mut self) -> Result<bool> {
        match self.history.redo() {
            Some(snapshot) => {
                self.restore(&snapshot?)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn record(&mut self) {
        if self.replaying {
            return;
        }
        if let Err(e) = self.history.push(&self.snapshot()) {
            log::warn!("Failed to record undo snapshot: {}", e);
        }
    }

    /// Bring the workspace to `target` through the regular mutators, so
    /// every stream observes the difference
    fn restore(&mut self, target: &GraphSnapshot) -> Result<()> {
        self.replaying = true;
        let result = self.apply_snapshot(target);
        self.replaying = false;
        if let Err(e) = &result {
            log::error!("Undo/redo left the workspace partially restored: {}", e);
        }
        result
    }

    fn apply_snapshot(&mut self, target: &GraphSnapshot) -> Result<()> {
        let stale_links: Vec<String> = self
            .graph
            .links()
            .filter(|l| target.link(&l.link_id) != Some(l))
            .map(|l| l.link_id.clone())
            .collect();
        for link_id in stale_links {
            self.delete_link(&link_id)?;
        }

        let stale_operators: Vec<OperatorId> = self
            .graph
            .operators()
            .filter(|op| {
                target.operator(&op.operator_id).map_or(true, |t| {
                    t.operator_type != op.operator_type
                        || t.input_ports != op.input_ports
                        || t.output_ports != op.output_ports
                })
            })
            .map(|op| op.operator_id.clone())
            .collect();
        for operator_id in stale_operators {
            self.delete_operator(&operator_id)?;
        }

        for operator in &target.operators {
            let position = target
                .positions
                .get(&operator.operator_id)
                .copied()
                .unwrap_or_default();

            if !self.graph.has_operator(&operator.operator_id) {
                self.add_operator(operator.clone(), position)?;
                self.graph.set_operator_advanced(&operator.operator_id, operator.show_advanced)?;
                continue;
            }

            self.set_operator_property(&operator.operator_id, operator.properties.clone())?;
            self.set_operator_advanced(&operator.operator_id, operator.show_advanced)?;
            if self.visual.operator_position(&operator.operator_id)? != position {
                self.set_operator_position(&operator.operator_id, position)?;
            }
        }

        for link in &target.links {
            if !self.graph.has_link(&link.link_id) {
                self.add_link(link.clone())?;
            }
        }
        Ok(())
    }
}

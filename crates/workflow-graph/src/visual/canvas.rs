//! Canvas cell model
//!
//! Mirrors what a diagramming canvas keeps per cell: operator elements with
//! a position, and links between elements. Changes come back as generic
//! [`CellEvent`]s that do not say whether the cell was an operator or a
//! link; the adapter narrows them.

use std::collections::HashMap;

use crate::error::{GraphError, Result};
use crate::types::{Link, Point};

/// One canvas cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// An operator box
    Element { id: String, position: Point },
    /// A link between two operator boxes
    Link { link: Link },
}

impl Cell {
    pub fn id(&self) -> &str {
        match self {
            Cell::Element { id, .. } => id,
            Cell::Link { link } => &link.link_id,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self, Cell::Element { .. })
    }
}

/// Generic cell lifecycle event
#[derive(Debug, Clone, PartialEq)]
pub enum CellEvent {
    Added(Cell),
    Removed(Cell),
    Moved { id: String, position: Point },
}

/// Cells currently on the canvas
#[derive(Debug, Default)]
pub struct CanvasModel {
    cells: HashMap<String, Cell>,
}

impl CanvasModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cell(&self, id: &str) -> Option<&Cell> {
        self.cells.get(id)
    }

    /// All cells, in no particular order
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Insert a cell; link cells need both end elements present
    pub fn add_cell(&mut self, cell: Cell) -> Result<CellEvent> {
        if self.cells.contains_key(cell.id()) {
            return Err(GraphError::DuplicateCell(cell.id().to_string()));
        }
        if let Cell::Link { link } = &cell {
            for end in [&link.source.operator_id, &link.target.operator_id] {
                match self.cells.get(end) {
                    Some(c) if c.is_element() => {}
                    _ => return Err(GraphError::CellNotFound(end.clone())),
                }
            }
        }

        self.cells.insert(cell.id().to_string(), cell.clone());
        Ok(CellEvent::Added(cell))
    }

    /// Remove a cell
    ///
    /// Removing an element first removes every link cell attached to it, the
    /// way the canvas does, so the returned events list those links before
    /// the element.
    pub fn remove_cell(&mut self, id: &str) -> Result<Vec<CellEvent>> {
        let cell = self
            .cells
            .get(id)
            .ok_or_else(|| GraphError::CellNotFound(id.to_string()))?;

        let mut removed_ids = Vec::new();
        if cell.is_element() {
            let mut attached: Vec<String> = self
                .cells
                .values()
                .filter_map(|c| match c {
                    Cell::Link { link } if link.touches(id) => Some(link.link_id.clone()),
                    _ => None,
                })
                .collect();
            attached.sort();
            removed_ids.extend(attached);
        }
        removed_ids.push(id.to_string());

        Ok(removed_ids
            .into_iter()
            .filter_map(|cell_id| self.cells.remove(&cell_id))
            .map(CellEvent::Removed)
            .collect())
    }

    /// Move an element
    pub fn move_element(&mut self, id: &str, to: Point) -> Result<CellEvent> {
        match self.cells.get_mut(id) {
            Some(Cell::Element { position, .. }) => {
                *position = to;
                Ok(CellEvent::Moved {
                    id: id.to_string(),
                    position: to,
                })
            }
            Some(Cell::Link { .. }) => Err(GraphError::NotAnOperator(id.to_string())),
            None => Err(GraphError::CellNotFound(id.to_string())),
        }
    }
}

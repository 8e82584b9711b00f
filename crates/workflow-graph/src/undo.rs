//! Undo/redo history of workflow snapshots
//!
//! Each entry is a zstd-compressed JSON encoding of a [`GraphSnapshot`]:
//! operators, links and operator positions after one facade mutation.
//! Restoring an entry is the facade's job; this module only stores them.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::graph::WorkflowGraph;
use crate::types::{Link, Operator, OperatorId, Point};
use crate::visual::VisualGraphAdapter;

/// Compression level for stored snapshots
const ZSTD_LEVEL: i32 = 3;

/// Everything needed to rebuild a workflow on the canvas
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Operators sorted by ID
    pub operators: Vec<Operator>,
    /// Links sorted by ID
    pub links: Vec<Link>,
    pub positions: BTreeMap<OperatorId, Point>,
}

impl GraphSnapshot {
    /// Capture the current graph and operator positions
    pub fn capture(graph: &WorkflowGraph, visual: &VisualGraphAdapter) -> Self {
        let mut operators: Vec<Operator> = graph.operators().cloned().collect();
        operators.sort_by(|a, b| a.operator_id.cmp(&b.operator_id));

        let mut links: Vec<Link> = graph.links().cloned().collect();
        links.sort_by(|a, b| a.link_id.cmp(&b.link_id));

        let positions = operators
            .iter()
            .filter_map(|op| {
                visual
                    .operator_position(&op.operator_id)
                    .ok()
                    .map(|p| (op.operator_id.clone(), p))
            })
            .collect();

        Self {
            operators,
            links,
            positions,
        }
    }

    pub fn operator(&self, operator_id: &str) -> Option<&Operator> {
        self.operators.iter().find(|op| op.operator_id == operator_id)
    }

    pub fn link(&self, link_id: &str) -> Option<&Link> {
        self.links.iter().find(|l| l.link_id == link_id)
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let json = serde_json::to_vec(self)?;
        zstd::encode_all(&json[..], ZSTD_LEVEL).map_err(|e| GraphError::Snapshot(e.to_string()))
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let json = zstd::decode_all(bytes).map_err(|e| GraphError::Snapshot(e.to_string()))?;
        Ok(serde_json::from_slice(&json)?)
    }
}

/// Bounded history with a cursor
///
/// The entry under the cursor is the current state. Pushing drops every
/// entry after the cursor; going over `max_snapshots` drops the oldest.
pub struct UndoStack {
    snapshots: VecDeque<Vec<u8>>,
    cursor: usize,
    max_snapshots: usize,
}

impl UndoStack {
    pub fn new(max_snapshots: usize) -> Self {
        Self {
            snapshots: VecDeque::new(),
            cursor: 0,
            max_snapshots: max_snapshots.max(1),
        }
    }

    /// Record a new current state
    pub fn push(&mut self, snapshot: &GraphSnapshot) -> Result<()> {
        let encoded = snapshot.encode()?;

        self.snapshots.truncate(self.cursor + 1);
        if self.snapshots.is_empty() {
            self.cursor = 0;
        }
        self.snapshots.push_back(encoded);
        self.cursor = self.snapshots.len() - 1;

        while self.snapshots.len() > self.max_snapshots {
            self.snapshots.pop_front();
            self.cursor = self.cursor.saturating_sub(1);
        }
        Ok(())
    }

    /// Step back; `None` at the oldest entry
    pub fn undo(&mut self) -> Option<Result<GraphSnapshot>> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        Some(self.snapshot_at(self.cursor))
    }

    /// Step forward; `None` at the newest entry
    pub fn redo(&mut self) -> Option<Result<GraphSnapshot>> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(self.snapshot_at(self.cursor))
    }

    pub fn current(&self) -> Option<Result<GraphSnapshot>> {
        if self.snapshots.is_empty() {
            None
        } else {
            Some(self.snapshot_at(self.cursor))
        }
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    fn snapshot_at(&self, index: usize) -> Result<GraphSnapshot> {
        GraphSnapshot::decode(&self.snapshots[index])
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(crate::constants::MAX_UNDO_SNAPSHOTS)
    }
}

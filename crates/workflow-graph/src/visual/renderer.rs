//! Rendering seam
//!
//! The adapter forwards every visual change to a [`CanvasRenderer`]. The
//! real drawing surface lives outside this crate; it only has to apply
//! these commands.

use std::sync::{Arc, Mutex};

use crate::types::{Link, OperatorId, Point};

/// Drawing command sent to the canvas
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasCommand {
    AddElement { operator_id: OperatorId, position: Point },
    AddLink { link: Link },
    RemoveCell { cell_id: String },
    MoveElement { operator_id: OperatorId, position: Point },
    Highlight { operator_id: OperatorId },
    Unhighlight { operator_id: OperatorId },
    /// Border styling for validation feedback
    SetValidity { operator_id: OperatorId, valid: bool },
    SetScale { ratio: f64 },
    SetTranslate { offset: Point },
}

/// Trait for the external drawing surface
pub trait CanvasRenderer: Send {
    fn apply(&mut self, command: CanvasCommand);
}

/// A renderer that draws nothing
pub struct NullRenderer;

impl CanvasRenderer for NullRenderer {
    fn apply(&mut self, _command: CanvasCommand) {}
}

/// A renderer that records commands
///
/// Useful for testing what would have been drawn.
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    commands: Arc<Mutex<Vec<CanvasCommand>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands applied so far
    pub fn commands(&self) -> Vec<CanvasCommand> {
        self.commands
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

impl CanvasRenderer for RecordingRenderer {
    fn apply(&mut self, command: CanvasCommand) {
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(command);
        }
    }
}

//! Workflow Graph - graph state and canvas synchronization for the workflow editor
//!
//! This crate holds the editor's workflow model and keeps a canvas mirror
//! of it in step. It provides:
//!
//! - A semantic graph of operators and links with change streams
//! - A visual adapter for cells, highlight, zoom and pan
//! - A facade that is the only way to mutate the graph
//! - Schema-driven operator validation
//! - Compressed snapshot-based undo/redo
//!
//! # Architecture
//!
//! - `WorkflowGraph`: Source of truth; reads are public, writes go through the facade
//! - `VisualGraphAdapter`: Canvas state, drawn through a `CanvasRenderer`
//! - `GraphActionFacade`: Applies each mutation to the graph, then to the canvas
//! - `EventChannel`: Broadcast streams, one per component, filterable per kind
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use workflow_graph::{GraphActionFacade, Point, SchemaCatalog};
//!
//! let catalog = Arc::new(SchemaCatalog::from_json(METADATA)?);
//! let mut facade = GraphActionFacade::new(catalog);
//! let scan = facade.create_operator("ScanSource")?;
//! facade.add_operator(scan, Point::new(100.0, 40.0))?;
//! ```

pub mod constants;
pub mod debounce;
pub mod error;
pub mod events;
pub mod facade;
pub mod graph;
pub mod schema;
pub mod types;
pub mod undo;
pub mod validation;
pub mod visual;

// Re-export key types
pub use debounce::{debounce, form_input_channel};
pub use error::{GraphError, Result};
pub use events::{EventChannel, EventStream, GraphEvent, ValidationEvent, VisualEvent};
pub use facade::GraphActionFacade;
pub use graph::WorkflowGraph;
pub use schema::{OperatorMetadata, OperatorSchema, SchemaCatalog};
pub use types::{Link, LinkEndpoint, LinkId, Operator, OperatorId, Point, PortId, PropertyBag};
pub use undo::{GraphSnapshot, UndoStack};
pub use validation::{OperatorValidator, SchemaValidator, ValidationIssue};
pub use visual::{CanvasCommand, CanvasRenderer, NullRenderer, RecordingRenderer, VisualGraphAdapter};

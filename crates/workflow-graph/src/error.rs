//! Error types for the workflow graph

use thiserror::Error;

/// Result type alias using GraphError
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors raised by graph, canvas and facade operations
///
/// Every variant is an invariant violation of the attempted operation. The
/// operation that returns one has not mutated any state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    /// Operator ID is not in the graph
    #[error("operator with ID {0} doesn't exist")]
    OperatorNotFound(String),

    /// Operator ID is already in the graph
    #[error("operator with ID {0} already exists")]
    DuplicateOperator(String),

    /// Link ID is not in the graph
    #[error("link with ID {0} doesn't exist")]
    LinkNotFound(String),

    /// Link ID is already in the graph
    #[error("link with ID {0} already exists")]
    DuplicateLink(String),

    /// A link with the same source and target endpoints already exists
    #[error("link from {source_id}.{source_port} to {target_id}.{target_port} already exists")]
    DuplicateConnection {
        source_id: String,
        source_port: String,
        target_id: String,
        target_port: String,
    },

    /// A link endpoint names a port the operator does not declare
    #[error("operator {operator_id} has no {direction} port {port_id}")]
    PortNotFound {
        operator_id: String,
        port_id: String,
        direction: &'static str,
    },

    /// Operator type is not in the schema catalog
    #[error("operatorType {0} doesn't exist in operator metadata")]
    UnknownOperatorType(String),

    /// Declared ports differ from the schema's port counts
    #[error("operator {operator_id} declares {actual} {direction} ports, schema requires {expected}")]
    PortCountMismatch {
        operator_id: String,
        direction: &'static str,
        expected: usize,
        actual: usize,
    },

    /// No canvas cell exists with this ID
    #[error("cell with ID {0} doesn't exist")]
    CellNotFound(String),

    /// A canvas cell with this ID already exists
    #[error("cell with ID {0} already exists")]
    DuplicateCell(String),

    /// The canvas cell exists but is a link, not an operator
    #[error("{0} is not an operator")]
    NotAnOperator(String),

    /// Zoom ratio must be a positive finite number
    #[error("invalid zoom ratio {0}")]
    InvalidZoom(f64),

    /// Schema catalog document could not be parsed
    #[error("invalid operator metadata: {0}")]
    Metadata(String),

    /// Undo snapshot could not be encoded or decoded
    #[error("snapshot error: {0}")]
    Snapshot(String),
}

impl GraphError {
    /// Whether the error reports a missing operator, link or cell
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::OperatorNotFound(_) | Self::LinkNotFound(_) | Self::CellNotFound(_)
        )
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(err: serde_json::Error) -> Self {
        Self::Snapshot(err.to_string())
    }
}

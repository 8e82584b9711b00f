//! Core types for workflow graphs
//!
//! These types define the semantic structure of a workflow: operators,
//! the links between their ports, and canvas coordinates.

use serde::{Deserialize, Serialize};

/// Unique identifier for an operator
pub type OperatorId = String;

/// Unique identifier for a link
pub type LinkId = String;

/// Identifier of a port on an operator
pub type PortId = String;

/// Opaque property bag, interpreted only by the form renderer
pub type PropertyBag = serde_json::Map<String, serde_json::Value>;

/// A 2D canvas coordinate
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// An operator instance in a workflow
///
/// Operators are values: editing properties produces a new `Operator`, so a
/// clone taken before the edit keeps the old property bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operator {
    /// Unique, stable identifier
    #[serde(rename = "operatorID")]
    pub operator_id: OperatorId,
    /// Type name in the schema catalog (e.g. "ScanSource")
    pub operator_type: String,
    /// Property values edited through the property form
    #[serde(rename = "operatorProperties")]
    pub properties: PropertyBag,
    /// Input port IDs, fixed at creation
    pub input_ports: Vec<PortId>,
    /// Output port IDs, fixed at creation
    pub output_ports: Vec<PortId>,
    /// Whether the property form shows advanced options
    pub show_advanced: bool,
}

impl Operator {
    /// Create an operator with the given ports and an empty property bag
    pub fn new(
        operator_id: impl Into<String>,
        operator_type: impl Into<String>,
        input_ports: Vec<PortId>,
        output_ports: Vec<PortId>,
    ) -> Self {
        Self {
            operator_id: operator_id.into(),
            operator_type: operator_type.into(),
            properties: PropertyBag::new(),
            input_ports,
            output_ports,
            show_advanced: false,
        }
    }

    /// Replace the property bag
    pub fn with_properties(mut self, properties: PropertyBag) -> Self {
        self.properties = properties;
        self
    }

    /// Whether the operator declares this input port
    pub fn has_input_port(&self, port_id: &str) -> bool {
        self.input_ports.iter().any(|p| p == port_id)
    }

    /// Whether the operator declares this output port
    pub fn has_output_port(&self, port_id: &str) -> bool {
        self.output_ports.iter().any(|p| p == port_id)
    }
}

/// One end of a link: an operator and one of its ports
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkEndpoint {
    #[serde(rename = "operatorID")]
    pub operator_id: OperatorId,
    #[serde(rename = "portID")]
    pub port_id: PortId,
}

impl LinkEndpoint {
    pub fn new(operator_id: impl Into<String>, port_id: impl Into<String>) -> Self {
        Self {
            operator_id: operator_id.into(),
            port_id: port_id.into(),
        }
    }
}

/// A directed link from an output port to an input port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename = "linkID")]
    pub link_id: LinkId,
    pub source: LinkEndpoint,
    pub target: LinkEndpoint,
}

impl Link {
    pub fn new(link_id: impl Into<String>, source: LinkEndpoint, target: LinkEndpoint) -> Self {
        Self {
            link_id: link_id.into(),
            source,
            target,
        }
    }

    /// Whether either endpoint references the operator
    pub fn touches(&self, operator_id: &str) -> bool {
        self.source.operator_id == operator_id || self.target.operator_id == operator_id
    }

    /// Whether both links connect the same endpoints
    pub fn same_connection(&self, other: &Link) -> bool {
        self.source == other.source && self.target == other.target
    }
}

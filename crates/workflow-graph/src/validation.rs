//! Operator validation
//!
//! A validator is a pure function of one operator and the graph it sits in.
//! The facade runs it for every operator a mutation touches and attaches the
//! boolean result to that operator for visual feedback.

use std::sync::Arc;

use crate::graph::WorkflowGraph;
use crate::schema::SchemaCatalog;
use crate::types::Operator;

/// Decides whether an operator is runnable in its current graph
pub trait OperatorValidator: Send + Sync {
    fn validate(&self, operator: &Operator, graph: &WorkflowGraph) -> bool;
}

impl<F> OperatorValidator for F
where
    F: Fn(&Operator, &WorkflowGraph) -> bool + Send + Sync,
{
    fn validate(&self, operator: &Operator, graph: &WorkflowGraph) -> bool {
        self(operator, graph)
    }
}

/// Reason an operator fails validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// The operator type is not in the schema catalog
    UnknownOperatorType { operator_id: String, operator_type: String },
    /// A property the schema requires is absent or null
    MissingProperty { operator_id: String, property: String },
    /// An input port does not have exactly one incoming link
    UnconnectedInput { operator_id: String, port_id: String },
    /// An output port has no outgoing link
    UnconnectedOutput { operator_id: String, port_id: String },
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownOperatorType {
                operator_id,
                operator_type,
            } => write!(f, "Unknown operator type '{}' for operator '{}'", operator_type, operator_id),
            Self::MissingProperty {
                operator_id,
                property,
            } => write!(f, "Required property '{}' on operator '{}' is not set", property, operator_id),
            Self::UnconnectedInput { operator_id, port_id } => {
                write!(f, "Input '{}' on operator '{}' is not connected", port_id, operator_id)
            }
            Self::UnconnectedOutput { operator_id, port_id } => {
                write!(f, "Output '{}' on operator '{}' is not connected", port_id, operator_id)
            }
        }
    }
}

impl std::error::Error for ValidationIssue {}

/// Validates properties against the schema's `required` list and checks
/// that every port is wired
pub struct SchemaValidator {
    catalog: Arc<SchemaCatalog>,
}

impl SchemaValidator {
    pub fn new(catalog: Arc<SchemaCatalog>) -> Self {
        Self { catalog }
    }

    /// All issues found for the operator (not just the first)
    pub fn issues(&self, operator: &Operator, graph: &WorkflowGraph) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        match self.catalog.schema(&operator.operator_type) {
            Some(schema) => {
                for property in schema.required_properties() {
                    let present = operator
                        .properties
                        .get(property)
                        .is_some_and(|v| !v.is_null());
                    if !present {
                        issues.push(ValidationIssue::MissingProperty {
                            operator_id: operator.operator_id.clone(),
                            property: property.to_string(),
                        });
                    }
                }
            }
            None => issues.push(ValidationIssue::UnknownOperatorType {
                operator_id: operator.operator_id.clone(),
                operator_type: operator.operator_type.clone(),
            }),
        }

        validate_connections(operator, graph, &mut issues);
        issues
    }
}

impl OperatorValidator for SchemaValidator {
    fn validate(&self, operator: &Operator, graph: &WorkflowGraph) -> bool {
        let issues = self.issues(operator, graph);
        for issue in &issues {
            log::trace!("{}", issue);
        }
        issues.is_empty()
    }
}

/// Each input port needs exactly one link, each output port at least one
fn validate_connections(operator: &Operator, graph: &WorkflowGraph, issues: &mut Vec<ValidationIssue>) {
    let id = operator.operator_id.as_str();

    for port in &operator.input_ports {
        let count = graph
            .incoming_links(id)
            .filter(|l| &l.target.port_id == port)
            .count();
        if count != 1 {
            issues.push(ValidationIssue::UnconnectedInput {
                operator_id: id.to_string(),
                port_id: port.clone(),
            });
        }
    }

    for port in &operator.output_ports {
        if !graph.outgoing_links(id).any(|l| &l.source.port_id == port) {
            issues.push(ValidationIssue::UnconnectedOutput {
                operator_id: id.to_string(),
                port_id: port.clone(),
            });
        }
    }
}

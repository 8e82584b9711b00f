//! Logical plan sent to the execution backend
//!
//! One node per operator with its type and flattened properties, one edge
//! per link as an `(origin, destination)` operator pair. Port IDs are not
//! part of the plan.

use serde::{Deserialize, Serialize};
use workflow_graph::{OperatorId, PropertyBag, WorkflowGraph};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicalOperator {
    #[serde(rename = "operatorID")]
    pub operator_id: OperatorId,
    pub operator_type: String,
    #[serde(flatten)]
    pub properties: PropertyBag,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalLink {
    pub origin: OperatorId,
    pub destination: OperatorId,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogicalPlan {
    pub operators: Vec<LogicalOperator>,
    pub links: Vec<LogicalLink>,
}

impl LogicalPlan {
    /// Build the plan for the graph's current state
    ///
    /// Operators and links are sorted by ID so equal graphs give equal plans.
    pub fn from_graph(graph: &WorkflowGraph) -> Self {
        let mut operators: Vec<LogicalOperator> = graph
            .operators()
            .map(|op| LogicalOperator {
                operator_id: op.operator_id.clone(),
                operator_type: op.operator_type.clone(),
                properties: op.properties.clone(),
            })
            .collect();
        operators.sort_by(|a, b| a.operator_id.cmp(&b.operator_id));

        let mut links: Vec<_> = graph.links().collect();
        links.sort_by(|a, b| a.link_id.cmp(&b.link_id));
        let links = links
            .into_iter()
            .map(|link| LogicalLink {
                origin: link.source.operator_id.clone(),
                destination: link.target.operator_id.clone(),
            })
            .collect();

        Self { operators, links }
    }
}

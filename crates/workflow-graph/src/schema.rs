//! Operator schema catalog
//!
//! The catalog maps operator type strings to their schema: port counts,
//! the JSON property-shape descriptor handed to the form renderer, and
//! human-readable metadata for the operator palette. It is loaded once from
//! the backend's operator metadata document.
//!
//! The graph only consumes port counts (to build and check operators) and,
//! through the default validator, the schema's `required` list. The rest of
//! the property descriptor is opaque here.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants::ids;
use crate::error::{GraphError, Result};
use crate::types::{Operator, PortId};

/// Display and port metadata of one operator type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalMetadata {
    pub user_friendly_name: String,
    pub operator_description: String,
    pub operator_group_name: String,
    pub num_input_ports: usize,
    pub num_output_ports: usize,
    #[serde(default)]
    pub advanced_options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_description: Option<HashMap<String, String>>,
}

/// Schema of one operator type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorSchema {
    pub operator_type: String,
    /// JSON schema of the property bag
    pub json_schema: serde_json::Value,
    pub additional_metadata: AdditionalMetadata,
}

impl OperatorSchema {
    /// Property names the JSON schema marks as required
    pub fn required_properties(&self) -> Vec<&str> {
        self.json_schema
            .get("required")
            .and_then(|r| r.as_array())
            .map(|names| names.iter().filter_map(|n| n.as_str()).collect())
            .unwrap_or_default()
    }

    /// Generated input port IDs (`input-0`, `input-1`, ...)
    pub fn input_port_ids(&self) -> Vec<PortId> {
        port_ids(ids::INPUT_PORT_PREFIX, self.additional_metadata.num_input_ports)
    }

    /// Generated output port IDs (`output-0`, `output-1`, ...)
    pub fn output_port_ids(&self) -> Vec<PortId> {
        port_ids(ids::OUTPUT_PORT_PREFIX, self.additional_metadata.num_output_ports)
    }
}

fn port_ids(prefix: &str, count: usize) -> Vec<PortId> {
    (0..count).map(|i| format!("{}{}", prefix, i)).collect()
}

/// A palette group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    pub group_name: String,
    pub group_order: u32,
}

/// The backend's operator metadata document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatorMetadata {
    pub operators: Vec<OperatorSchema>,
    #[serde(default)]
    pub groups: Vec<GroupInfo>,
}

/// Registry of operator schemas keyed by operator type
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    schemas: HashMap<String, OperatorSchema>,
    groups: Vec<GroupInfo>,
}

impl SchemaCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from a parsed metadata document
    pub fn from_metadata(metadata: OperatorMetadata) -> Self {
        let mut catalog = Self::new();
        for schema in metadata.operators {
            catalog.register(schema);
        }
        catalog.groups = metadata.groups;
        catalog.groups.sort_by_key(|g| g.group_order);
        catalog
    }

    /// Parse the backend's metadata JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let metadata: OperatorMetadata =
            serde_json::from_str(json).map_err(|e| GraphError::Metadata(e.to_string()))?;
        log::debug!("Loaded {} operator schemas", metadata.operators.len());
        Ok(Self::from_metadata(metadata))
    }

    /// Register a schema, replacing any schema of the same type
    pub fn register(&mut self, schema: OperatorSchema) {
        self.schemas.insert(schema.operator_type.clone(), schema);
    }

    pub fn schema(&self, operator_type: &str) -> Option<&OperatorSchema> {
        self.schemas.get(operator_type)
    }

    pub fn has_operator_type(&self, operator_type: &str) -> bool {
        self.schemas.contains_key(operator_type)
    }

    pub fn operator_types(&self) -> Vec<&str> {
        self.schemas.keys().map(|s| s.as_str()).collect()
    }

    /// Palette groups in display order
    pub fn groups(&self) -> &[GroupInfo] {
        &self.groups
    }

    /// Schemas grouped by their group name
    pub fn schemas_by_group(&self) -> HashMap<&str, Vec<&OperatorSchema>> {
        let mut grouped: HashMap<&str, Vec<&OperatorSchema>> = HashMap::new();
        for schema in self.schemas.values() {
            grouped
                .entry(schema.additional_metadata.operator_group_name.as_str())
                .or_default()
                .push(schema);
        }
        grouped
    }

    /// Create a fresh operator of the given type
    ///
    /// The operator gets a random `operator-<uuid>` ID, an empty property
    /// bag, ports generated from the schema and advanced options hidden.
    pub fn new_operator(&self, operator_type: &str) -> Result<Operator> {
        let schema = self
            .schema(operator_type)
            .ok_or_else(|| GraphError::UnknownOperatorType(operator_type.to_string()))?;

        Ok(Operator::new(
            format!("{}{}", ids::OPERATOR_PREFIX, uuid::Uuid::new_v4()),
            operator_type,
            schema.input_port_ids(),
            schema.output_port_ids(),
        ))
    }

    /// Check that an operator's type is known and its port counts match
    pub fn check_operator(&self, operator: &Operator) -> Result<()> {
        let schema = self
            .schema(&operator.operator_type)
            .ok_or_else(|| GraphError::UnknownOperatorType(operator.operator_type.clone()))?;
        let meta = &schema.additional_metadata;

        if operator.input_ports.len() != meta.num_input_ports {
            return Err(GraphError::PortCountMismatch {
                operator_id: operator.operator_id.clone(),
                direction: "input",
                expected: meta.num_input_ports,
                actual: operator.input_ports.len(),
            });
        }
        if operator.output_ports.len() != meta.num_output_ports {
            return Err(GraphError::PortCountMismatch {
                operator_id: operator.operator_id.clone(),
                direction: "output",
                expected: meta.num_output_ports,
                actual: operator.output_ports.len(),
            });
        }
        Ok(())
    }
}

/// Fixture catalog shared by tests across the crate
#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub const METADATA_JSON: &str = r#"{
        "operators": [
            {
                "operatorType": "ScanSource",
                "jsonSchema": {
                    "type": "object",
                    "properties": { "tableName": { "type": "string" } },
                    "required": ["tableName"]
                },
                "additionalMetadata": {
                    "userFriendlyName": "Source: Scan",
                    "operatorDescription": "Read records from a table one by one",
                    "operatorGroupName": "Source",
                    "numInputPorts": 0,
                    "numOutputPorts": 1,
                    "advancedOptions": [],
                    "propertyDescription": { "tableName": "name of the source table" }
                }
            },
            {
                "operatorType": "NlpSentiment",
                "jsonSchema": {
                    "type": "object",
                    "properties": {
                        "attribute": { "type": "string" },
                        "resultAttribute": { "type": "string" }
                    },
                    "required": ["attribute", "resultAttribute"]
                },
                "additionalMetadata": {
                    "userFriendlyName": "Sentiment Analysis",
                    "operatorDescription": "Sentiment analysis",
                    "operatorGroupName": "Analysis",
                    "numInputPorts": 1,
                    "numOutputPorts": 1
                }
            },
            {
                "operatorType": "ViewResults",
                "jsonSchema": {
                    "type": "object",
                    "properties": {
                        "limit": { "type": "integer", "default": 10 },
                        "offset": { "type": "integer", "default": 0 }
                    }
                },
                "additionalMetadata": {
                    "userFriendlyName": "View Results",
                    "operatorDescription": "View the results of the workflow",
                    "operatorGroupName": "View Results",
                    "numInputPorts": 1,
                    "numOutputPorts": 0
                }
            }
        ],
        "groups": [
            { "groupName": "View Results", "groupOrder": 3 },
            { "groupName": "Source", "groupOrder": 1 },
            { "groupName": "Analysis", "groupOrder": 2 }
        ]
    }"#;

    pub fn catalog() -> SchemaCatalog {
        SchemaCatalog::from_json(METADATA_JSON).unwrap()
    }

    pub fn scan(id: &str) -> Operator {
        Operator::new(id, "ScanSource", vec![], vec!["output-0".into()])
    }

    pub fn sentiment(id: &str) -> Operator {
        Operator::new(id, "NlpSentiment", vec!["input-0".into()], vec!["output-0".into()])
    }

    pub fn view_results(id: &str) -> Operator {
        Operator::new(id, "ViewResults", vec!["input-0".into()], vec![])
    }
}

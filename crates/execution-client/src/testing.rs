//! Shared test fixtures

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use workflow_graph::{GraphActionFacade, Link, LinkEndpoint, Operator, Point, SchemaCatalog};

use crate::error::TransportError;
use crate::transport::{ExecutionTransport, HttpResponse};

const METADATA_JSON: &str = r#"{
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
                "numOutputPorts": 1
            }
        },
        {
            "operatorType": "ViewResults",
            "jsonSchema": { "type": "object", "properties": {} },
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
        { "groupName": "Source", "groupOrder": 1 },
        { "groupName": "View Results", "groupOrder": 2 }
    ]
}"#;

/// `scan` (tableName = twitter_sample) linked to `result`
pub fn scan_result_facade() -> GraphActionFacade {
    let catalog = Arc::new(SchemaCatalog::from_json(METADATA_JSON).unwrap());
    let mut facade = GraphActionFacade::new(catalog);

    let scan = Operator::new("scan", "ScanSource", vec![], vec!["output-0".into()])
        .with_properties(json!({"tableName": "twitter_sample"}).as_object().unwrap().clone());
    let result = Operator::new("result", "ViewResults", vec!["input-0".into()], vec![]);

    facade.add_operator(scan, Point::new(100.0, 100.0)).unwrap();
    facade.add_operator(result, Point::new(400.0, 100.0)).unwrap();
    facade
        .add_link(Link::new(
            "link-1",
            LinkEndpoint::new("scan", "output-0"),
            LinkEndpoint::new("result", "input-0"),
        ))
        .unwrap();
    facade
}

type Scripted = (String, Duration, Result<HttpResponse, String>);

/// Transport answering from a script, matched by URL suffix in FIFO order
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<Vec<Scripted>>,
    requests: Mutex<Vec<(String, serde_json::Value)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, path: &str, delay: Duration, status: u16, body: serde_json::Value) {
        let response = HttpResponse {
            status,
            body: body.to_string(),
        };
        self.script.lock().push((path.to_string(), delay, Ok(response)));
    }

    pub fn fail(&self, path: &str, reason: &str) {
        self.script
            .lock()
            .push((path.to_string(), Duration::ZERO, Err(reason.to_string())));
    }

    /// URL and body of every request received so far
    pub fn requests(&self) -> Vec<(String, serde_json::Value)> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ExecutionTransport for MockTransport {
    async fn post(&self, url: &str, body: serde_json::Value) -> Result<HttpResponse, TransportError> {
        self.requests.lock().push((url.to_string(), body));

        let scripted = {
            let mut script = self.script.lock();
            script
                .iter()
                .position(|(path, _, _)| url.ends_with(path.as_str()))
                .map(|index| script.remove(index))
        };
        let Some((_, delay, response)) = scripted else {
            return Err(TransportError::Other(format!("no scripted response for {}", url)));
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        response.map_err(TransportError::Other)
    }
}

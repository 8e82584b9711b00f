//! Execution results and response classification
//!
//! Every settled request becomes an [`ExecutionResult`], whatever went
//! wrong. Rules are applied in a fixed order:
//!
//! 1. 2xx with a well-formed payload: the payload's code, tables or message
//! 2. 4xx with a structured error body: the body's code and message
//! 3. 5xx with a structured error body: the body's code, message prefixed
//!    with `"<server> error: "`
//! 4. Anything else, transport failures included: code 1,
//!    `"Could not reach <server>"`
//!
//! An error status is never a success: an error body claiming the success
//! code is reported with code 1 instead.

use serde::{Deserialize, Serialize};
use workflow_graph::OperatorId;

use crate::constants::codes;
use crate::error::TransportError;
use crate::transport::HttpResponse;

/// Result code of a successful execution
pub const SUCCESS_CODE: i64 = codes::SUCCESS;

/// Rows produced by one sink operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    #[serde(rename = "operatorID")]
    pub operator_id: OperatorId,
    pub table: Vec<serde_json::Map<String, serde_json::Value>>,
}

/// Normalized outcome of an execution or control request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ExecutionResult {
    Completed { tables: Vec<ResultTable> },
    Failed { code: i64, message: String },
}

impl ExecutionResult {
    pub fn code(&self) -> i64 {
        match self {
            Self::Completed { .. } => SUCCESS_CODE,
            Self::Failed { code, .. } => *code,
        }
    }

    /// Error message of a failed result
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Completed { .. } => None,
            Self::Failed { message, .. } => Some(message),
        }
    }

    /// The fixed result for responses that cannot be interpreted
    pub fn unreachable(server_name: &str) -> Self {
        Self::Failed {
            code: codes::UNREACHABLE,
            message: format!("Could not reach {}", server_name),
        }
    }
}

/// True iff the result carries the success code
pub fn is_execution_successful(result: &ExecutionResult) -> bool {
    result.code() == SUCCESS_CODE
}

/// A classified response plus the execution ID the server issued, if any
#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub result: ExecutionResult,
    pub execution_id: Option<String>,
}

/// Body of a 2xx response
#[derive(Debug, Deserialize)]
struct SuccessPayload {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    result: Vec<ResultTable>,
    #[serde(rename = "executionID", default)]
    execution_id: Option<String>,
}

/// Structured error body of a 4xx/5xx response
#[derive(Debug, Deserialize)]
struct ErrorPayload {
    code: i64,
    message: String,
}

/// Classify a settled request
pub fn classify(response: std::result::Result<HttpResponse, TransportError>, server_name: &str) -> Classified {
    let response = match response {
        Ok(response) => response,
        Err(e) => {
            log::warn!("Request to {} failed: {}", server_name, e);
            return unreachable(server_name);
        }
    };

    match response.status {
        200..=299 => match serde_json::from_str::<SuccessPayload>(&response.body) {
            Ok(payload) => {
                let result = if payload.code == SUCCESS_CODE {
                    ExecutionResult::Completed { tables: payload.result }
                } else {
                    ExecutionResult::Failed {
                        code: payload.code,
                        message: payload.message.unwrap_or_default(),
                    }
                };
                Classified {
                    result,
                    execution_id: payload.execution_id,
                }
            }
            Err(e) => {
                log::warn!("Malformed {} payload from {}: {}", response.status, server_name, e);
                unreachable(server_name)
            }
        },
        400..=599 => match serde_json::from_str::<ErrorPayload>(&response.body) {
            Ok(body) => {
                let message = if response.status >= 500 {
                    format!("{} error: {}", server_name, body.message)
                } else {
                    body.message
                };
                let code = if body.code == SUCCESS_CODE {
                    log::warn!("{} response from {} carries the success code", response.status, server_name);
                    codes::UNREACHABLE
                } else {
                    body.code
                };
                Classified {
                    result: ExecutionResult::Failed { code, message },
                    execution_id: None,
                }
            }
            Err(_) => {
                log::warn!("Unstructured {} response from {}", response.status, server_name);
                unreachable(server_name)
            }
        },
        status => {
            log::warn!("Unexpected status {} from {}", status, server_name);
            unreachable(server_name)
        }
    }
}

fn unreachable(server_name: &str) -> Classified {
    Classified {
        result: ExecutionResult::unreachable(server_name),
        execution_id: None,
    }
}

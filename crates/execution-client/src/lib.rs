//! Execution Client - runs workflow graphs on a remote backend
//!
//! This crate turns a [`workflow_graph::WorkflowGraph`] into a logical plan,
//! sends it to the execution backend and reports the outcome. It supports:
//!
//! - Start/end events for every execution request
//! - Normalized results for backend, server and network failures
//! - Pause and resume of the current execution
//! - Stale-response detection when runs overlap
//!
//! # Example
//!
//! ```ignore
//! use execution_client::{ExecutionClient, ExecutionConfig};
//!
//! let client = ExecutionClient::new(ExecutionConfig::load("execution.json")?)?;
//! let mut ended = client.ended_stream();
//! client.execute_workflow(facade.graph());
//! let result = ended.next().await;
//! ```

pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod request;
pub mod result;
pub mod transport;

#[cfg(test)]
mod testing;

// Re-export key types
pub use client::{ExecutionClient, ExecutionEvent, ExecutionState};
pub use config::ExecutionConfig;
pub use error::{ConfigError, ControlAction, ExecutionError, Result, TransportError};
pub use request::{LogicalLink, LogicalOperator, LogicalPlan};
pub use result::{classify, is_execution_successful, Classified, ExecutionResult, ResultTable, SUCCESS_CODE};
pub use transport::{ExecutionTransport, HttpResponse, ReqwestTransport};

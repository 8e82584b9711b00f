//! Error types for the execution client

use thiserror::Error;

/// Result type alias for execution client operations
pub type Result<T> = std::result::Result<T, ExecutionError>;

/// Errors returned synchronously, before any request is sent
///
/// Backend and network failures are not errors at this level; they are
/// classified into a failed [`crate::ExecutionResult`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// Pause or resume without a current execution
    #[error("Workflow ID undefined when attempting to {action}")]
    MissingExecutionId { action: ControlAction },

    /// Pause or resume from a state that does not allow it
    #[error("Cannot {action} while execution is {state}")]
    InvalidState {
        action: ControlAction,
        state: crate::client::ExecutionState,
    },
}

/// Failure of the transport itself: no HTTP status was received
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    #[error("Transport error: {0}")]
    Other(String),
}

/// Errors loading an [`crate::ExecutionConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Execution control requests that need an execution ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    Pause,
    Resume,
}

impl std::fmt::Display for ControlAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pause => write!(f, "pause"),
            Self::Resume => write!(f, "resume"),
        }
    }
}

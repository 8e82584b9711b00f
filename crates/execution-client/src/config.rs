//! Configuration for the execution client

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{defaults, timeouts};
use crate::error::ConfigError;

/// Where and how to reach the execution backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Base URL, without trailing slash (e.g., "http://localhost:8080")
    pub base_url: String,
    /// Name used in user-facing error messages (e.g., "Texera server")
    pub server_name: String,
    pub execute_path: String,
    pub pause_path: String,
    pub resume_path: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::BASE_URL.to_string(),
            server_name: defaults::SERVER_NAME.to_string(),
            execute_path: defaults::EXECUTE_PATH.to_string(),
            pause_path: defaults::PAUSE_PATH.to_string(),
            resume_path: defaults::RESUME_PATH.to_string(),
            timeout_secs: timeouts::REQUEST_SECS,
        }
    }
}

impl ExecutionConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::debug!("Loaded execution config from {}", path.display());
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Full URL of an endpoint path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

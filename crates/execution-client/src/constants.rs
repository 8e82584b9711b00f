//! Execution client constants
//!
//! Single source of truth for endpoint defaults and result codes.

/// Default endpoint configuration
pub mod defaults {
    /// Base URL of a locally running backend
    pub const BASE_URL: &str = "http://localhost:8080";
    /// Name used in user-facing error messages
    pub const SERVER_NAME: &str = "Texera server";
    /// Path receiving logical plans
    pub const EXECUTE_PATH: &str = "/api/execute";
    /// Path pausing a running execution
    pub const PAUSE_PATH: &str = "/api/pause";
    /// Path resuming a paused execution
    pub const RESUME_PATH: &str = "/api/resume";
}

/// Timeout configuration (in seconds)
pub mod timeouts {
    /// Upper bound for a single request, enforced by the transport
    pub const REQUEST_SECS: u64 = 60;
}

/// Result codes carried by backend payloads
pub mod codes {
    /// Code of a successful execution
    pub const SUCCESS: i64 = 0;
    /// Code reported when the backend response cannot be interpreted
    pub const UNREACHABLE: i64 = 1;
}

/// Event channel capacity for execution events
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

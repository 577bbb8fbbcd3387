// ABOUTME: Error types for sandbox lifecycle operations
// ABOUTME: Provisioning and readiness failures are fatal to one sandbox instance and never retried here

use thiserror::Error;

/// Errors from creating a sandbox container.
///
/// Provisioning is all-or-nothing: on any of these the caller gets no
/// sandbox and no container is left behind (partial creations are removed
/// best-effort before the error propagates).
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Container runtime unreachable or refusing requests
    #[error("Container runtime error: {0}")]
    Runtime(String),

    /// Requested image is not present locally
    #[error("Image not found: {0}")]
    ImageMissing(String),

    /// Generated container name already taken
    #[error("Container name conflict: {0}")]
    NameConflict(String),

    /// Configured network does not exist
    #[error("Network not found: {0}")]
    NetworkMissing(String),

    /// Container came up without a resolvable network address
    #[error("Container {0} has no resolvable address")]
    Unaddressable(String),

    /// Any other creation failure
    #[error("Failed to create container: {0}")]
    Create(String),
}

/// Errors from waiting for a sandbox's internal services to come up.
#[derive(Error, Debug)]
pub enum ReadinessError {
    /// Attempt budget exhausted without all services reaching RUNNING
    #[error("Sandbox not ready after {attempts} attempts")]
    Timeout { attempts: u32 },

    /// A service reported a terminal broken state on consecutive polls
    #[error("Service {service} is in terminal state {state}")]
    ServiceFatal { service: String, state: String },
}

/// Errors from constructing or using a sandbox handle's HTTP client.
///
/// These never cross the tool-call boundary: tool methods fold them into
/// `ToolResult` envelopes. They surface only from typed internal calls
/// such as the supervisor status query the readiness probe issues.
#[derive(Error, Debug)]
pub enum HandleError {
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

pub type ProvisionResult<T> = std::result::Result<T, ProvisionError>;

// ABOUTME: Core type definitions for sandbox lifecycle and tool invocation
// ABOUTME: Defines the sandbox entity, service status reporting, and the uniform tool result envelope

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_config::SandboxConfig;

/// Sandbox lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxState {
    /// Container creation requested, not yet addressable
    Provisioning,
    /// Container running, internal services still coming up
    AwaitingReady,
    /// All internal services report running
    Ready,
    /// Handed to a session for tool calls
    InUse,
    /// Removal requested
    Destroying,
    /// Container gone
    Destroyed,
    /// Provisioning or readiness failed; terminal
    Failed,
}

/// One provisioned sandbox.
///
/// Exists only with a resolved address: the provisioner does not return a
/// value of this type until container inspection yielded one. Exclusively
/// owned by a single logical session for its whole life.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sandbox {
    /// Generated unique name, also the container name
    pub name: String,
    /// Runtime-assigned container id
    pub container_id: String,
    /// IP at which the in-sandbox API listens
    pub addr: String,
    /// Configuration captured at creation time, immutable afterwards
    pub config: SandboxConfig,
    pub state: SandboxState,
    pub created_at: DateTime<Utc>,
}

impl Sandbox {
    pub fn transition(&mut self, state: SandboxState) {
        self.state = state;
    }
}

/// Run state of one supervised process inside a sandbox.
///
/// The supervisor reports supervisord-style state names; mapping is
/// case-insensitive and names this enum does not know are carried through
/// as `Unknown` rather than dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum ServiceState {
    Running,
    Starting,
    Backoff,
    Stopped,
    Exited,
    Fatal,
    Unknown(String),
}

impl From<String> for ServiceState {
    fn from(raw: String) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "RUNNING" => ServiceState::Running,
            "STARTING" => ServiceState::Starting,
            "BACKOFF" => ServiceState::Backoff,
            "STOPPED" => ServiceState::Stopped,
            "EXITED" => ServiceState::Exited,
            "FATAL" => ServiceState::Fatal,
            _ => ServiceState::Unknown(raw),
        }
    }
}

impl ServiceState {
    /// A state the supervisor will not recover from by waiting longer.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ServiceState::Stopped | ServiceState::Exited | ServiceState::Fatal
        )
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceState::Running => write!(f, "RUNNING"),
            ServiceState::Starting => write!(f, "STARTING"),
            ServiceState::Backoff => write!(f, "BACKOFF"),
            ServiceState::Stopped => write!(f, "STOPPED"),
            ServiceState::Exited => write!(f, "EXITED"),
            ServiceState::Fatal => write!(f, "FATAL"),
            ServiceState::Unknown(raw) => write!(f, "{}", raw),
        }
    }
}

/// Status of one service as reported by the in-sandbox supervisor.
/// Read fresh on every poll, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub name: String,
    #[serde(rename = "statename")]
    pub state: ServiceState,
    #[serde(default)]
    pub description: String,
}

/// Supervisor status response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct SupervisorStatus {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Vec<ServiceStatus>,
}

/// Uniform response envelope for every tool invocation.
///
/// Tool failures are data, not exceptions: transport errors and
/// application-level tool errors both land here with `success = false`,
/// so the calling workflow can branch without exception machinery around
/// every call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn failure(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            message: error.clone(),
            data: None,
            error: Some(error),
        }
    }

    pub fn success(message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_service_state_parsing_is_case_insensitive() {
        assert_eq!(ServiceState::from("running".to_string()), ServiceState::Running);
        assert_eq!(ServiceState::from("RUNNING".to_string()), ServiceState::Running);
        assert_eq!(ServiceState::from("Fatal".to_string()), ServiceState::Fatal);
    }

    #[test]
    fn test_unknown_service_state_is_carried_through() {
        let state = ServiceState::from("QUANTUM".to_string());
        assert_eq!(state, ServiceState::Unknown("QUANTUM".to_string()));
        assert_eq!(state.to_string(), "QUANTUM");
        assert!(!state.is_terminal());
    }

    #[test]
    fn test_terminal_states() {
        assert!(ServiceState::Fatal.is_terminal());
        assert!(ServiceState::Stopped.is_terminal());
        assert!(ServiceState::Exited.is_terminal());
        assert!(!ServiceState::Running.is_terminal());
        assert!(!ServiceState::Starting.is_terminal());
        assert!(!ServiceState::Backoff.is_terminal());
    }

    #[test]
    fn test_supervisor_status_deserialization() {
        let raw = r#"{
            "success": true,
            "data": [
                {"name": "xvfb", "statename": "RUNNING", "description": "pid 12, uptime 0:01:02"},
                {"name": "chrome", "statename": "STARTING"}
            ]
        }"#;

        let status: SupervisorStatus = serde_json::from_str(raw).unwrap();
        assert!(status.success);
        assert_eq!(status.data.len(), 2);
        assert_eq!(status.data[0].state, ServiceState::Running);
        assert_eq!(status.data[1].state, ServiceState::Starting);
        assert_eq!(status.data[1].description, "");
    }

    #[test]
    fn test_tool_result_deserialization_with_missing_fields() {
        let result: ToolResult = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(result.success);
        assert_eq!(result.message, "");
        assert_eq!(result.data, None);
        assert_eq!(result.error, None);
    }

    #[test]
    fn test_tool_result_failure_populates_error() {
        let result = ToolResult::failure("connection refused");
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("connection refused"));
    }
}

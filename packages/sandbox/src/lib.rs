// ABOUTME: Sandbox lifecycle management for Warden
// ABOUTME: Provision, await readiness, proxy tool calls, destroy

pub mod browser;
pub mod error;
pub mod handle;
pub mod probe;
pub mod provisioner;
pub mod reaper;
pub mod registry;
pub mod retry;
pub mod types;

pub use browser::{BrowserClient, CDP_PORT};
pub use error::{HandleError, ProvisionError, ReadinessError};
pub use handle::{SandboxHandle, API_PORT};
pub use probe::{await_ready, ProbeConfig};
pub use provisioner::Provisioner;
pub use reaper::Reaper;
pub use registry::{SessionEntry, SessionSandboxes};
pub use types::{Sandbox, SandboxState, ServiceState, ServiceStatus, SupervisorStatus, ToolResult};
pub use warden_config::SandboxConfig;

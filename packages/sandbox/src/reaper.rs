// ABOUTME: Idempotent sandbox destruction releasing local and runtime resources
// ABOUTME: Destroy is a statement about desired end-state; already-gone containers count as success

use crate::error::{ProvisionError, ProvisionResult};
use crate::registry::SessionEntry;
use crate::types::SandboxState;
use bollard::{
    container::RemoveContainerOptions, errors::Error as BollardError, Docker,
};
use tracing::{debug, info, warn};

/// Removes sandbox containers and releases handle resources.
pub struct Reaper {
    docker: Docker,
}

impl Reaper {
    /// Connect to the local Docker daemon and verify it responds.
    pub async fn connect() -> ProvisionResult<Self> {
        let docker = Docker::connect_with_defaults()
            .map_err(|e| ProvisionError::Runtime(e.to_string()))?;

        docker
            .ping()
            .await
            .map_err(|e| ProvisionError::Runtime(e.to_string()))?;

        Ok(Self { docker })
    }

    /// Create with a specific Docker connection.
    pub fn with_client(docker: Docker) -> Self {
        Self { docker }
    }

    /// Destroy a session's sandbox, consuming the registry entry.
    ///
    /// The handle drops first so its connection pool is released no matter
    /// what the runtime says afterwards. Destruction commonly runs on
    /// error-recovery and shutdown paths, so nothing here ever raises:
    /// the boolean is the whole outcome.
    pub async fn destroy(&self, entry: SessionEntry) -> bool {
        let SessionEntry { mut sandbox, handle } = entry;
        drop(handle);

        sandbox.transition(SandboxState::Destroying);
        let removed = self.destroy_by_name(&sandbox.name).await;
        if removed {
            sandbox.transition(SandboxState::Destroyed);
        }
        removed
    }

    /// Force-remove a container by name.
    ///
    /// Safe to call repeatedly and while tool calls against the same
    /// sandbox are still in flight; it acts only on the container.
    pub async fn destroy_by_name(&self, name: &str) -> bool {
        debug!("Removing sandbox container {}", name);

        let options = RemoveContainerOptions {
            force: true,
            v: true,
            ..Default::default()
        };

        let outcome = removal_outcome(
            self.docker.remove_container(name, Some(options)).await,
            name,
        );
        if outcome {
            info!("Removed sandbox container {}", name);
        }
        outcome
    }
}

/// Fold the runtime's answer into the boolean contract: gone is gone,
/// whether or not this call did the work.
fn removal_outcome(result: Result<(), BollardError>, name: &str) -> bool {
    match result {
        Ok(()) => true,
        Err(BollardError::DockerResponseServerError {
            status_code: 404, ..
        }) => {
            debug!("Container {} already removed", name);
            true
        }
        Err(e) => {
            warn!("Failed to remove container {}: {}", name, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_removal_is_true() {
        assert!(removal_outcome(Ok(()), "sandbox-1"));
    }

    #[test]
    fn test_already_gone_folds_into_success() {
        let not_found = BollardError::DockerResponseServerError {
            status_code: 404,
            message: "No such container: sandbox-1".to_string(),
        };
        assert!(removal_outcome(Err(not_found), "sandbox-1"));
    }

    #[test]
    fn test_other_runtime_errors_surface_as_false() {
        let denied = BollardError::DockerResponseServerError {
            status_code: 403,
            message: "permission denied".to_string(),
        };
        assert!(!removal_outcome(Err(denied), "sandbox-1"));

        let unavailable = BollardError::DockerResponseServerError {
            status_code: 500,
            message: "daemon shutting down".to_string(),
        };
        assert!(!removal_outcome(Err(unavailable), "sandbox-1"));
    }
}

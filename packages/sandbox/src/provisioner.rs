// ABOUTME: Docker sandbox provisioning via bollard
// ABOUTME: Creates one isolated container per session and resolves its network address

use crate::error::{ProvisionError, ProvisionResult};
use crate::types::{Sandbox, SandboxState};
use bollard::{
    container::{Config, CreateContainerOptions, RemoveContainerOptions, StartContainerOptions},
    errors::Error as BollardError,
    models::{ContainerInspectResponse, HostConfig},
    Docker,
};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};
use warden_config::SandboxConfig;

/// Label applied to every Warden-managed container
const MANAGED_LABEL: &str = "warden.managed";
const NAME_LABEL: &str = "warden.sandbox";

/// Chrome needs a larger shared-memory segment than the Docker default
const SHM_SIZE_BYTES: i64 = 2 * 1024 * 1024 * 1024;

/// Creates sandbox containers and resolves them to usable addresses.
///
/// Provisioning is all-or-nothing from the caller's perspective: either a
/// fully addressable `Sandbox` comes back or an error does, and on the
/// error paths partially created containers are removed best-effort.
pub struct Provisioner {
    docker: Docker,
}

impl Provisioner {
    /// Connect to the local Docker daemon and verify it responds.
    pub async fn connect() -> ProvisionResult<Self> {
        let docker = Docker::connect_with_defaults()
            .map_err(|e| ProvisionError::Runtime(e.to_string()))?;

        docker.ping().await.map_err(|e| {
            error!("Failed to connect to Docker daemon: {}", e);
            ProvisionError::Runtime(e.to_string())
        })?;

        Ok(Self { docker })
    }

    /// Create with a specific Docker connection.
    pub fn with_client(docker: Docker) -> Self {
        Self { docker }
    }

    /// Create a sandbox container and resolve its network address.
    ///
    /// The returned sandbox is in `AwaitingReady` state: the container is
    /// running but its internal services have not been probed yet.
    pub async fn provision(&self, config: &SandboxConfig) -> ProvisionResult<Sandbox> {
        let name = generate_name(&config.name_prefix);
        debug!("Provisioning sandbox {} from image {}", name, config.image);

        self.ensure_image(&config.image).await?;

        let container_config = Config {
            image: Some(config.image.clone()),
            env: Some(build_env(config)),
            labels: Some(HashMap::from([
                (MANAGED_LABEL.to_string(), "true".to_string()),
                (NAME_LABEL.to_string(), name.clone()),
            ])),
            host_config: Some(HostConfig {
                auto_remove: Some(true),
                shm_size: Some(SHM_SIZE_BYTES),
                network_mode: config.network.clone(),
                ..Default::default()
            }),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: name.clone(),
            platform: None,
        };

        let container_id = self
            .docker
            .create_container(Some(options), container_config)
            .await
            .map_err(|e| {
                error!("Failed to create container {}: {}", name, e);
                classify_create_error(&e, &name, config)
            })?
            .id;

        if let Err(e) = self
            .docker
            .start_container(&name, None::<StartContainerOptions<String>>)
            .await
        {
            error!("Failed to start container {}: {}", name, e);
            self.remove_partial(&name).await;
            return Err(classify_start_error(&e, config));
        }

        let inspect = self
            .docker
            .inspect_container(&name, None)
            .await
            .map_err(|e| ProvisionError::Runtime(e.to_string()))?;

        let addr = match resolve_address(&inspect) {
            Some(addr) => addr,
            None => {
                // A container that exited immediately has no address left.
                warn!("Container {} came up without an address", name);
                self.remove_partial(&name).await;
                return Err(ProvisionError::Unaddressable(name));
            }
        };

        info!("Provisioned sandbox {} at {}", name, addr);

        Ok(Sandbox {
            name,
            container_id,
            addr,
            config: config.clone(),
            state: SandboxState::AwaitingReady,
            created_at: chrono::Utc::now(),
        })
    }

    /// Verify the image exists locally; images are expected to be pre-pulled.
    async fn ensure_image(&self, image: &str) -> ProvisionResult<()> {
        match self.docker.inspect_image(image).await {
            Ok(_) => Ok(()),
            Err(BollardError::DockerResponseServerError {
                status_code: 404, ..
            }) => Err(ProvisionError::ImageMissing(image.to_string())),
            Err(e) => Err(ProvisionError::Runtime(e.to_string())),
        }
    }

    /// Best-effort removal of a partially created container on error paths.
    async fn remove_partial(&self, name: &str) {
        let options = RemoveContainerOptions {
            force: true,
            v: true,
            ..Default::default()
        };

        if let Err(e) = self.docker.remove_container(name, Some(options)).await {
            match e {
                BollardError::DockerResponseServerError {
                    status_code: 404, ..
                } => {}
                _ => warn!("Failed to clean up partial container {}: {}", name, e),
            }
        }
    }
}

/// Combine the configured prefix with a fresh random suffix.
fn generate_name(prefix: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &suffix[..8])
}

/// Environment variables injected into the container.
fn build_env(config: &SandboxConfig) -> Vec<String> {
    let mut env = vec![
        format!("SERVICE_TIMEOUT_MINUTES={}", config.ttl_minutes),
        format!("CHROME_ARGS={}", config.chrome_args),
    ];

    if config.proxy_configured() {
        if let Some(http_proxy) = &config.http_proxy {
            env.push(format!("HTTP_PROXY={}", http_proxy));
        }
        if let Some(https_proxy) = &config.https_proxy {
            env.push(format!("HTTPS_PROXY={}", https_proxy));
        }
        env.push(format!(
            "NO_PROXY={}",
            config.no_proxy.as_deref().unwrap_or("localhost")
        ));
    }

    env
}

/// Extract the container's IP from an inspect response.
///
/// The top-level address is empty for containers attached to a named
/// network; fall back to the first per-network endpoint that has one.
fn resolve_address(inspect: &ContainerInspectResponse) -> Option<String> {
    let settings = inspect.network_settings.as_ref()?;

    if let Some(ip) = settings.ip_address.as_ref().filter(|ip| !ip.is_empty()) {
        return Some(ip.clone());
    }

    settings
        .networks
        .as_ref()?
        .values()
        .filter_map(|endpoint| endpoint.ip_address.clone())
        .find(|ip| !ip.is_empty())
}

fn classify_create_error(
    error: &BollardError,
    name: &str,
    config: &SandboxConfig,
) -> ProvisionError {
    match error {
        BollardError::DockerResponseServerError {
            status_code: 409, ..
        } => ProvisionError::NameConflict(name.to_string()),
        BollardError::DockerResponseServerError {
            status_code: 404,
            message,
        } => {
            if message.contains("image") {
                ProvisionError::ImageMissing(config.image.clone())
            } else if message.contains("network") {
                ProvisionError::NetworkMissing(
                    config.network.clone().unwrap_or_default(),
                )
            } else {
                ProvisionError::Create(message.clone())
            }
        }
        BollardError::DockerResponseServerError { message, .. } => {
            ProvisionError::Create(message.clone())
        }
        _ => ProvisionError::Runtime(error.to_string()),
    }
}

fn classify_start_error(error: &BollardError, config: &SandboxConfig) -> ProvisionError {
    match error {
        BollardError::DockerResponseServerError {
            status_code: 404,
            message,
        } if message.contains("network") => ProvisionError::NetworkMissing(
            config.network.clone().unwrap_or_default(),
        ),
        BollardError::DockerResponseServerError { message, .. } => {
            ProvisionError::Create(message.clone())
        }
        _ => ProvisionError::Runtime(error.to_string()),
    }
}

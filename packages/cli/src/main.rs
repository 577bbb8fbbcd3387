// ABOUTME: Operator CLI that exercises the full sandbox lifecycle end to end
// ABOUTME: Provision, await readiness, run a command, print its output, destroy

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use warden_config::SandboxConfig;
use warden_sandbox::{
    await_ready, ProbeConfig, Provisioner, Reaper, SandboxHandle, SandboxState, SessionEntry,
};

#[derive(Parser)]
#[command(name = "warden", about = "Sandbox lifecycle manager", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision a sandbox, run a command in it, and tear it down
    Run {
        /// Override the configured container image
        #[arg(long)]
        image: Option<String>,

        /// Command to execute inside the sandbox
        #[arg(long, default_value = "echo hello from warden")]
        command: String,

        /// Working directory for the command
        #[arg(long, default_value = "/tmp")]
        exec_dir: String,
    },
    /// Force-remove a leftover sandbox container by name
    Destroy {
        /// Container name, as printed by `run`
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            image,
            command,
            exec_dir,
        } => run(image, command, exec_dir).await,
        Commands::Destroy { name } => destroy(name).await,
    }
}

async fn run(image: Option<String>, command: String, exec_dir: String) -> Result<()> {
    let mut config = SandboxConfig::from_env();
    if let Some(image) = image {
        config.image = image;
    }

    let provisioner = Provisioner::connect()
        .await
        .context("connecting to Docker daemon")?;
    let reaper = Reaper::connect()
        .await
        .context("connecting to Docker daemon")?;

    let mut sandbox = provisioner
        .provision(&config)
        .await
        .context("provisioning sandbox")?;
    info!("Sandbox {} provisioned at {}", sandbox.name, sandbox.addr);

    let handle = match SandboxHandle::new(&sandbox) {
        Ok(handle) => handle,
        Err(e) => {
            reaper.destroy_by_name(&sandbox.name).await;
            bail!("binding sandbox handle: {}", e);
        }
    };

    if let Err(e) = await_ready(&handle, &ProbeConfig::default()).await {
        // The sandbox never became usable; discard it before reporting.
        reaper.destroy_by_name(&sandbox.name).await;
        bail!("sandbox {} never became ready: {}", sandbox.name, e);
    }
    sandbox.transition(SandboxState::Ready);

    sandbox.transition(SandboxState::InUse);
    let exec = handle.shell_exec("main", &exec_dir, &command).await;
    if !exec.success {
        warn!(
            "Command failed to start: {}",
            exec.error.as_deref().unwrap_or("unknown error")
        );
    }

    let wait = handle.shell_wait("main", Some(60)).await;
    if !wait.success {
        warn!(
            "Command did not finish cleanly: {}",
            wait.error.as_deref().unwrap_or("unknown error")
        );
    }

    let view = handle.shell_view("main", true).await;
    match view.data.as_ref().and_then(|data| data["output"].as_str()) {
        Some(output) => println!("{}", output),
        None => println!("{}", view.message),
    }

    let destroyed = reaper.destroy(SessionEntry { sandbox, handle }).await;
    if !destroyed {
        bail!("sandbox could not be removed; try `warden destroy <name>` later");
    }

    Ok(())
}

async fn destroy(name: String) -> Result<()> {
    let reaper = Reaper::connect()
        .await
        .context("connecting to Docker daemon")?;

    if reaper.destroy_by_name(&name).await {
        info!("Sandbox {} removed", name);
        Ok(())
    } else {
        bail!("failed to remove sandbox {}", name)
    }
}

//! Local container runtime client for `microcks start` and `microcks stop`
//!
//! Drives the docker or podman binary directly, so no runtime API socket
//! handling is needed. The container publishes port 8080/tcp on all host
//! interfaces.

use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use microcks_shared::{MicrocksError, Result};

/// Supported container runtimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    Docker,
    Podman,
}

impl Driver {
    /// Name of the binary to invoke.
    pub fn command(&self) -> &'static str {
        match self {
            Driver::Docker => "docker",
            Driver::Podman => "podman",
        }
    }
}

impl std::fmt::Display for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.command())
    }
}

impl std::str::FromStr for Driver {
    type Err = MicrocksError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "docker" => Ok(Driver::Docker),
            "podman" => Ok(Driver::Podman),
            other => Err(MicrocksError::Validation(format!(
                "unsupported container driver: {other}"
            ))),
        }
    }
}

/// Settings for creating a Microcks container.
#[derive(Debug, Clone, Default)]
pub struct ContainerOpts {
    pub image: String,
    /// Host port mapped onto the container's 8080/tcp
    pub port: String,
    pub auto_remove: bool,
    pub name: String,
}

/// Client driving a local container runtime binary.
pub struct ContainerClient {
    driver: Driver,
}

impl ContainerClient {
    pub fn new(driver: Driver) -> Self {
        ContainerClient { driver }
    }

    /// Pulls the image and creates the container, returning its id.
    pub async fn create_container(&self, opts: &ContainerOpts) -> Result<String> {
        info!("pulling image {}", opts.image);
        self.run(&["pull".to_string(), opts.image.clone()]).await?;

        let stdout = self.run(&create_args(opts)).await?;
        Ok(stdout.trim().to_string())
    }

    pub async fn start_container(&self, container_id: &str) -> Result<()> {
        self.run(&["start".to_string(), container_id.to_string()])
            .await?;
        Ok(())
    }

    /// Stops the container without waiting for a graceful exit.
    pub async fn stop_container(&self, container_id: &str) -> Result<()> {
        self.run(&[
            "stop".to_string(),
            "--time".to_string(),
            "0".to_string(),
            container_id.to_string(),
        ])
        .await?;
        Ok(())
    }

    async fn run(&self, args: &[String]) -> Result<String> {
        let program = self.driver.command();
        debug!("running {program} {}", args.join(" "));

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| MicrocksError::Config(format!("cannot run {program}: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let action = args.first().map(String::as_str).unwrap_or("command");
            return Err(MicrocksError::Upstream(format!(
                "{program} {action} failed: {}",
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

fn create_args(opts: &ContainerOpts) -> Vec<String> {
    let mut args = vec![
        "create".to_string(),
        "--publish".to_string(),
        format!("0.0.0.0:{}:8080/tcp", opts.port),
    ];
    if opts.auto_remove {
        args.push("--rm".to_string());
    }
    if !opts.name.is_empty() {
        args.push("--name".to_string());
        args.push(opts.name.clone());
    }
    args.push(opts.image.clone());
    args
}

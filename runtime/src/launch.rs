//! Container launcher.
//!
//! The argument set is computed up front and is a pure function of the
//! config, so a bad project root fails before any subprocess is spawned and
//! the same config always produces the same command line.

use ers_types::{ContainerName, MountPathError, ServerConfig, derive_mounts};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::{ContainerRuntime, FailureClass, RuntimeError, args, is_running};

/// Where the server keeps its index inside the container.
pub const VOLUME_DATA_PATH: &str = "/usr/share/elasticsearch/data";

/// How the container's standard streams are wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchStyle {
    /// `run -d`, server reachable on the published port.
    Detached,
    /// `run -i`, server speaks over the attached stdin/stdout. No port is
    /// published.
    Interactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// A container with the configured name was already up; nothing ran.
    AlreadyRunning,
    Launched,
    /// `run` lost the name to a concurrent activation, which is starting
    /// that container now. Not confirmed running yet.
    StartedElsewhere,
}

impl LaunchOutcome {
    /// Whether the probe saw the container up before anything was run.
    #[must_use]
    pub const fn confirmed_running(self) -> bool {
        matches!(self, Self::AlreadyRunning)
    }
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error(transparent)]
    MountPath(#[from] MountPathError),
    #[error("failed to launch container {container}: {source}")]
    Runtime {
        container: ContainerName,
        #[source]
        source: RuntimeError,
    },
    #[error("launch of {container} cancelled")]
    Cancelled { container: ContainerName },
}

/// Arguments for `<runtime> run ...`, in a fixed order.
pub fn compute_launch_args(
    config: &ServerConfig,
    style: LaunchStyle,
) -> Result<Vec<String>, MountPathError> {
    let mounts = derive_mounts(config.project_roots())?;
    let port = config.port().to_string();

    let mut out = vec![
        "run".to_string(),
        match style {
            LaunchStyle::Detached => "-d",
            LaunchStyle::Interactive => "-i",
        }
        .to_string(),
        "--rm".to_string(),
        "--name".to_string(),
        config.container().to_string(),
        "--ulimit".to_string(),
        "memlock=-1:-1".to_string(),
        "-v".to_string(),
        format!("{}:{VOLUME_DATA_PATH}", config.volume()),
    ];

    if style == LaunchStyle::Detached {
        out.push("-p".to_string());
        out.push(format!("{port}:{port}"));
    }

    let roots = config
        .project_roots()
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(",");

    let mut env = vec![
        format!("SERVER_PORT={port}"),
        format!("LOG_LEVEL={}", config.log_level().as_env_value()),
        format!("HOST_PROJECT_ROOTS={roots}"),
    ];
    if !config.extra_packages().is_empty() {
        env.push(format!(
            "EXTRA_PACKAGES={}",
            config.extra_packages().join(" ")
        ));
    }
    for var in env {
        out.push("-e".to_string());
        out.push(var);
    }

    for mount in &mounts {
        out.push("--mount".to_string());
        out.push(mount.to_mount_arg());
    }

    out.push(config.image().to_string());
    Ok(out)
}

/// Start the detached server container unless one with the configured name
/// is already running, then wait `timings.settle` for it to come up.
pub async fn launch_if_not_running(
    runtime: &dyn ContainerRuntime,
    config: &ServerConfig,
    cancel: &CancellationToken,
) -> Result<LaunchOutcome, LaunchError> {
    let run_args = compute_launch_args(config, LaunchStyle::Detached)?;
    let container = config.container();

    if is_running(runtime, container).await {
        tracing::info!(container = %container, "Server container already running");
        return Ok(LaunchOutcome::AlreadyRunning);
    }
    if cancel.is_cancelled() {
        return Err(LaunchError::Cancelled {
            container: container.clone(),
        });
    }

    tracing::info!(container = %container, image = %config.image(), "Launching server container");
    let outcome = match runtime.exec(&run_args).await {
        Ok(_) => LaunchOutcome::Launched,
        Err(err) if err.classify() == FailureClass::AlreadyExists => {
            tracing::info!(container = %container, "Container name taken by a concurrent launch");
            LaunchOutcome::StartedElsewhere
        }
        Err(source) => {
            return Err(LaunchError::Runtime {
                container: container.clone(),
                source,
            });
        }
    };

    tokio::select! {
        () = tokio::time::sleep(config.timings().settle) => Ok(outcome),
        () = cancel.cancelled() => {
            // Nothing will tear down a container we started if activation stops here.
            if outcome == LaunchOutcome::Launched
                && let Err(e) = stop_container(runtime, container).await
            {
                tracing::warn!(container = %container, error = %e, "Failed to stop container after cancelled launch");
            }
            Err(LaunchError::Cancelled { container: container.clone() })
        }
    }
}

/// `stop <name>`. With `--rm` on launch this also removes the container.
pub async fn stop_container(
    runtime: &dyn ContainerRuntime,
    container: &ContainerName,
) -> Result<(), RuntimeError> {
    runtime
        .exec(&args(["stop", container.as_str()]))
        .await
        .map(|_| ())
}

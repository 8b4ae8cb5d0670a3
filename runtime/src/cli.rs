//! Subprocess-backed [`ContainerRuntime`].

use std::io;
use std::process::Stdio;

use tokio::process::Command;

use crate::{CommandOutput, ContainerRuntime, RuntimeError, RuntimeFut};

/// Drives a docker-compatible CLI (`docker`, `podman`, `nerdctl`).
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(&self, args: &[String]) -> Result<CommandOutput, RuntimeError> {
        let resolved = which::which(&self.binary).map_err(|_| RuntimeError::ToolMissing {
            binary: self.binary.clone(),
        })?;

        tracing::debug!(binary = %self.binary, args = ?args, "Running container runtime");
        let output = Command::new(&resolved)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| {
                if source.kind() == io::ErrorKind::NotFound {
                    RuntimeError::ToolMissing {
                        binary: self.binary.clone(),
                    }
                } else {
                    RuntimeError::Io {
                        binary: self.binary.clone(),
                        source,
                    }
                }
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(RuntimeError::Failed {
                binary: self.binary.clone(),
                command: args.join(" "),
                code: output.status.code(),
                stderr,
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }
}

impl ContainerRuntime for DockerCli {
    fn binary(&self) -> &str {
        &self.binary
    }

    fn exec<'a>(&'a self, args: &'a [String]) -> RuntimeFut<'a> {
        Box::pin(self.run(args))
    }
}

//! Container runtime driver.
//!
//! Every operation here shells out to a container runtime CLI (`docker` by
//! default) through the [`ContainerRuntime`] seam. Nothing about container
//! state is cached: each question is answered by asking the runtime again,
//! because a previous activation may have started the container or someone
//! may have stopped it since.

mod cli;
mod error;
mod launch;
mod notify;
mod probe;
mod pull;
mod retry;
mod volume;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

use std::future::Future;
use std::pin::Pin;

pub use cli::DockerCli;
pub use error::{FailureClass, RuntimeError};
pub use launch::{
    LaunchError, LaunchOutcome, LaunchStyle, VOLUME_DATA_PATH, compute_launch_args,
    launch_if_not_running, stop_container,
};
pub use notify::{Notifier, Remediation};
pub use probe::{Readiness, await_ready, is_running};
pub use pull::{MAX_PULL_ATTEMPTS, PullOutcome, ensure_image_pulled};
pub use retry::{RetryOutcome, RetryPolicy, Verdict, retry};
pub use volume::ensure_volume;

/// Captured output of a runtime invocation that exited successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub fn with_stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }
}

pub type RuntimeFut<'a> = Pin<Box<dyn Future<Output = Result<CommandOutput, RuntimeError>> + Send + 'a>>;

/// A container runtime CLI.
///
/// Implementations run `<binary> <args...>` and report a non-zero exit as
/// [`RuntimeError::Failed`]. The trait is object-safe so the orchestrator can
/// hold it behind an `Arc<dyn ContainerRuntime>`.
pub trait ContainerRuntime: Send + Sync {
    /// Executable name used in diagnostics (e.g. "docker").
    fn binary(&self) -> &str;

    fn exec<'a>(&'a self, args: &'a [String]) -> RuntimeFut<'a>;
}

/// Build an owned argument vector from string slices.
pub(crate) fn args<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|p| (*p).to_string()).collect()
}

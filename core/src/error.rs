use ers_lsp::ConnectError;
use ers_runtime::{LaunchError, RuntimeError};
use ers_types::{ContainerName, MountPathError, VolumeName};
use thiserror::Error;

/// Why an activation did not deliver a transport.
///
/// Pull failures and an unconfirmed probe are not here: both degrade to
/// carrying on and are reported through the activation's outcomes instead.
#[derive(Debug, Error)]
pub enum ActivationError {
    #[error(transparent)]
    MountPathInvalid(#[from] MountPathError),
    #[error("{binary} executable not found")]
    ToolMissing { binary: String },
    #[error("failed to create volume {volume}: {source}")]
    VolumeFailed {
        volume: VolumeName,
        #[source]
        source: RuntimeError,
    },
    #[error("failed to launch container {container}: {source}")]
    LaunchFailed {
        container: ContainerName,
        #[source]
        source: RuntimeError,
    },
    #[error("container {container} is already running; attach mode needs its own container")]
    AttachConflict { container: ContainerName },
    #[error(transparent)]
    ConnectFailed(#[from] ConnectError),
    #[error("activation cancelled")]
    Cancelled,
}

impl ActivationError {
    /// Whether the operator can fix this by changing configuration or
    /// installing something, as opposed to a runtime failure.
    #[must_use]
    pub const fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            Self::MountPathInvalid(_) | Self::ToolMissing { .. } | Self::AttachConflict { .. }
        )
    }
}

impl From<LaunchError> for ActivationError {
    fn from(err: LaunchError) -> Self {
        match err {
            LaunchError::MountPath(err) => Self::MountPathInvalid(err),
            LaunchError::Runtime { container, source } => Self::LaunchFailed { container, source },
            LaunchError::Cancelled { .. } => Self::Cancelled,
        }
    }
}

//! Container liveness.

use std::time::Duration;

use ers_types::ContainerName;
use tokio_util::sync::CancellationToken;

use crate::{ContainerRuntime, args};

/// `container top <name>` succeeds only while the container is running.
pub async fn is_running(runtime: &dyn ContainerRuntime, container: &ContainerName) -> bool {
    match runtime
        .exec(&args(["container", "top", container.as_str()]))
        .await
    {
        Ok(_) => true,
        Err(err) => {
            tracing::debug!(container = %container, error = %err, "Container not running");
            false
        }
    }
}

/// Result of [`await_ready`]. `NotConfirmed` is advisory: the connection
/// attempt that follows is the real gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    NotConfirmed,
}

/// Probe once, and if the container is not up yet wait `grace` and probe
/// one more time. Never loops further.
pub async fn await_ready(
    runtime: &dyn ContainerRuntime,
    container: &ContainerName,
    grace: Duration,
    cancel: &CancellationToken,
) -> Readiness {
    if is_running(runtime, container).await {
        return Readiness::Ready;
    }

    tracing::debug!(container = %container, grace_ms = grace.as_millis() as u64, "Waiting for container");
    tokio::select! {
        () = cancel.cancelled() => return Readiness::NotConfirmed,
        () = tokio::time::sleep(grace) => {}
    }

    if is_running(runtime, container).await {
        Readiness::Ready
    } else {
        tracing::warn!(container = %container, "Container liveness not confirmed, connecting anyway");
        Readiness::NotConfirmed
    }
}

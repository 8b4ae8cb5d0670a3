//! Lifecycle orchestrator.
//!
//! Pull -> volume -> launch if absent -> probe -> connect, strictly in that
//! order, each step awaited. Container state is asked of the runtime every
//! time; nothing from a previous activation is trusted.

use std::sync::Arc;

use ers_lsp::{Endpoint, Transport, connect};
use ers_runtime::{
    ContainerRuntime, LaunchOutcome, LaunchStyle, Notifier, PullOutcome, Readiness, Remediation,
    await_ready, compute_launch_args, ensure_image_pulled, ensure_volume, is_running,
    launch_if_not_running, stop_container,
};
use ers_types::{ContainerName, ServerConfig, TransportMode};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::ActivationError;
use crate::state::{LifecycleState, StateTracker};

/// A delivered connection and the means to tear it down.
///
/// The transport is owned here and moved out once, into the relay.
#[derive(Debug)]
pub struct Activation {
    pub transport: Transport,
    pub teardown: Teardown,
    pub pull: PullOutcome,
    pub launch: LaunchOutcome,
    /// `None` in attach mode, where the spawned process is the server.
    pub readiness: Option<Readiness>,
}

/// Stops the named container at deactivation.
pub struct Teardown {
    runtime: Arc<dyn ContainerRuntime>,
    container: ContainerName,
    state: Arc<StateTracker>,
}

impl std::fmt::Debug for Teardown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Teardown")
            .field("container", &self.container)
            .finish_non_exhaustive()
    }
}

impl Teardown {
    #[must_use]
    pub fn container(&self) -> &ContainerName {
        &self.container
    }

    /// Best effort: a failed stop is logged and otherwise ignored.
    pub async fn stop(self) {
        match stop_container(self.runtime.as_ref(), &self.container).await {
            Ok(()) => tracing::info!(container = %self.container, "Stopped server container"),
            Err(e) => {
                tracing::warn!(container = %self.container, error = %e, "Failed to stop server container");
            }
        }
        self.state.set(LifecycleState::Stopped);
    }
}

pub struct Orchestrator {
    runtime: Arc<dyn ContainerRuntime>,
    notifier: Arc<dyn Notifier>,
    cancel: CancellationToken,
    state: Arc<StateTracker>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("runtime", &self.runtime.binary())
            .field("state", &self.state.get())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            runtime,
            notifier,
            cancel: CancellationToken::new(),
            state: Arc::new(StateTracker::new()),
        }
    }

    /// Bound every wait and retry loop by `cancel`.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Every state entered so far, starting with `Idle`.
    #[must_use]
    pub fn history(&self) -> Vec<LifecycleState> {
        self.state.history()
    }

    fn fail(&self, err: ActivationError) -> ActivationError {
        tracing::error!(error = %err, "Activation failed");
        self.state.set(LifecycleState::Failed);
        err
    }

    fn check_cancelled(&self) -> Result<(), ActivationError> {
        if self.cancel.is_cancelled() {
            return Err(self.fail(ActivationError::Cancelled));
        }
        Ok(())
    }

    pub async fn activate(&self, config: &ServerConfig) -> Result<Activation, ActivationError> {
        let runtime = self.runtime.as_ref();
        let container = config.container();

        // Mount names are checked before any subprocess runs.
        let style = match config.transport() {
            TransportMode::Tcp => LaunchStyle::Detached,
            TransportMode::Attach => LaunchStyle::Interactive,
        };
        let launch_args = match compute_launch_args(config, style) {
            Ok(args) => args,
            Err(err) => {
                self.notifier.prompt(
                    &format!("Invalid project root: {err}"),
                    Remediation::OpenSettings,
                );
                return Err(self.fail(err.into()));
            }
        };

        self.state.set(LifecycleState::Pulling);
        let pull = ensure_image_pulled(
            runtime,
            self.notifier.as_ref(),
            config.image(),
            config.timings(),
            &self.cancel,
        )
        .await;
        match &pull {
            PullOutcome::ToolMissing => {
                return Err(self.fail(ActivationError::ToolMissing {
                    binary: runtime.binary().to_string(),
                }));
            }
            PullOutcome::Cancelled => return Err(self.fail(ActivationError::Cancelled)),
            PullOutcome::Pulled { .. } | PullOutcome::UsedLocal { .. } => {}
        }

        if let Err(source) = ensure_volume(runtime, config.volume()).await {
            return Err(self.fail(ActivationError::VolumeFailed {
                volume: config.volume().clone(),
                source,
            }));
        }
        self.state.set(LifecycleState::VolumeReady);
        self.check_cancelled()?;

        self.state.set(LifecycleState::Launching);
        let (endpoint, launch, readiness) = match config.transport() {
            TransportMode::Tcp => {
                let launch = launch_if_not_running(runtime, config, &self.cancel)
                    .await
                    .map_err(|e| self.fail(e.into()))?;

                self.state.set(LifecycleState::Probing);
                let readiness = if launch.confirmed_running() {
                    Readiness::Ready
                } else {
                    await_ready(
                        runtime,
                        container,
                        config.timings().probe_grace,
                        &self.cancel,
                    )
                    .await
                };
                if readiness == Readiness::NotConfirmed {
                    self.notifier.status(&format!(
                        "Server container {container} not confirmed running yet, connecting anyway"
                    ));
                }
                let endpoint = Endpoint::Tcp {
                    host: config.host().to_string(),
                    port: config.port(),
                };
                (endpoint, launch, Some(readiness))
            }
            TransportMode::Attach => {
                // A detached container's server listens on its port, not on
                // the stdin an attach would hand us.
                if is_running(runtime, container).await {
                    self.notifier.prompt(
                        &format!(
                            "Container {container} is already running. Attach mode starts its \
                             own container: stop it or use the tcp transport"
                        ),
                        Remediation::OpenSettings,
                    );
                    return Err(self.fail(ActivationError::AttachConflict {
                        container: container.clone(),
                    }));
                }
                self.state.set(LifecycleState::Probing);
                let endpoint = Endpoint::Process {
                    program: runtime.binary().to_string(),
                    args: launch_args,
                };
                (endpoint, LaunchOutcome::Launched, None)
            }
        };
        self.check_cancelled()?;

        let transport = connect(&endpoint).await.map_err(|e| self.fail(e.into()))?;
        self.state.set(LifecycleState::Connected);

        let teardown = Teardown {
            runtime: Arc::clone(&self.runtime),
            container: container.clone(),
            state: Arc::clone(&self.state),
        };
        self.state.set(LifecycleState::Active);
        Ok(Activation {
            transport,
            teardown,
            pull,
            launch,
            readiness,
        })
    }
}

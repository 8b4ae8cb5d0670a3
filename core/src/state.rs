use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

/// Where an activation is in its lifecycle.
///
/// ```text
/// Idle -> Pulling -> VolumeReady -> Launching -> Probing -> Connected -> Active -> Stopped
///            \___________\______________\____________\___________\-> Failed
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    #[default]
    Idle,
    Pulling,
    VolumeReady,
    Launching,
    Probing,
    Connected,
    /// Transport handed to the relay.
    Active,
    Failed,
    /// Torn down after being active.
    Stopped,
}

impl LifecycleState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Pulling => "pulling",
            Self::VolumeReady => "volume-ready",
            Self::Launching => "launching",
            Self::Probing => "probing",
            Self::Connected => "connected",
            Self::Active => "active",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Stopped)
    }

    /// Whether `self -> next` is an edge of the lifecycle graph.
    #[must_use]
    pub const fn can_become(self, next: Self) -> bool {
        use LifecycleState::{
            Active, Connected, Failed, Idle, Launching, Probing, Pulling, Stopped, VolumeReady,
        };
        matches!(
            (self, next),
            (Idle | Failed | Stopped, Pulling)
                | (Pulling, VolumeReady)
                | (VolumeReady, Launching)
                | (Launching, Probing)
                | (Probing, Connected)
                | (Connected, Active)
                | (Active, Stopped)
                | (Idle | Pulling | VolumeReady | Launching | Probing | Connected, Failed)
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Current state plus every state entered since creation.
#[derive(Debug)]
pub(crate) struct StateTracker {
    tx: watch::Sender<LifecycleState>,
    history: Mutex<Vec<LifecycleState>>,
}

impl StateTracker {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(LifecycleState::Idle);
        Self {
            tx,
            history: Mutex::new(vec![LifecycleState::Idle]),
        }
    }

    pub(crate) fn get(&self) -> LifecycleState {
        *self.tx.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.tx.subscribe()
    }

    pub(crate) fn history(&self) -> Vec<LifecycleState> {
        lock(&self.history).clone()
    }

    pub(crate) fn set(&self, next: LifecycleState) {
        let prev = self.get();
        if prev.can_become(next) {
            tracing::info!(from = %prev, to = %next, "Lifecycle transition");
        } else {
            tracing::warn!(from = %prev, to = %next, "Unexpected lifecycle transition");
        }
        lock(&self.history).push(next);
        self.tx.send_replace(next);
    }
}

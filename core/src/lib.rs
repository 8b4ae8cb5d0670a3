//! Container lifecycle orchestration for ers.
//!
//! [`Orchestrator::activate`] brings the server container up and hands back
//! an [`Activation`]: the open transport plus the [`Teardown`] that stops
//! the container again.

mod error;
mod orchestrator;
mod state;

pub use error::ActivationError;
pub use orchestrator::{Activation, Orchestrator, Teardown};
pub use state::LifecycleState;

//! Image puller.

use ers_types::{ImageReference, Timings};
use tokio_util::sync::CancellationToken;

use crate::{
    ContainerRuntime, FailureClass, Notifier, Remediation, RetryOutcome, RetryPolicy, Verdict,
    args, retry,
};

/// Upper bound on pull attempts, whatever the failure.
pub const MAX_PULL_ATTEMPTS: u32 = 10;

/// Result of [`ensure_image_pulled`]. Pull failures are reported, never
/// propagated: a previously pulled local image is good enough to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    Pulled { attempts: u32 },
    /// Pulling failed; whatever image is already local will be used.
    UsedLocal { attempts: u32, reason: String },
    /// The runtime executable is not installed. Nothing downstream can work.
    ToolMissing,
    Cancelled,
}

impl PullOutcome {
    #[must_use]
    pub const fn attempts(&self) -> Option<u32> {
        match self {
            Self::Pulled { attempts } | Self::UsedLocal { attempts, .. } => Some(*attempts),
            Self::ToolMissing | Self::Cancelled => None,
        }
    }
}

/// Pull `image`, retrying up to [`MAX_PULL_ATTEMPTS`] times.
///
/// - daemon not ready: status notice, wait `timings.daemon_wait`, retry
/// - tool missing: one modal prompt, stop
/// - anything else: warning, wait `timings.retry_backoff`, retry
pub async fn ensure_image_pulled(
    runtime: &dyn ContainerRuntime,
    notifier: &dyn Notifier,
    image: &ImageReference,
    timings: &Timings,
    cancel: &CancellationToken,
) -> PullOutcome {
    let pull_args = args(["pull", image.as_str()]);
    notifier.status(&format!("Pulling {image}"));

    let outcome = retry(
        RetryPolicy {
            max_attempts: MAX_PULL_ATTEMPTS,
        },
        cancel,
        |attempt| {
            tracing::debug!(image = %image, attempt, "Pulling image");
            runtime.exec(&pull_args)
        },
        |err, attempt| match err.classify() {
            FailureClass::ToolMissing => {
                notifier.prompt(
                    &format!(
                        "{} executable not found. Install it or point ers at another runtime.",
                        runtime.binary()
                    ),
                    Remediation::OpenSettings,
                );
                Verdict::Stop
            }
            FailureClass::DaemonNotReady => {
                notifier.status(&format!("Waiting for {} to start", runtime.binary()));
                Verdict::RetryAfter(timings.daemon_wait)
            }
            FailureClass::AlreadyExists | FailureClass::Other => {
                notifier.warn(&format!(
                    "Error updating image {image} (attempt {attempt}/{MAX_PULL_ATTEMPTS}), \
                     will try to use existing local one: {err}"
                ));
                Verdict::RetryAfter(timings.retry_backoff)
            }
        },
    )
    .await;

    match outcome {
        RetryOutcome::Success { attempts, .. } => {
            tracing::info!(image = %image, attempts, "Image is up to date");
            PullOutcome::Pulled { attempts }
        }
        RetryOutcome::Exhausted {
            attempts,
            last_error,
        } => {
            tracing::warn!(image = %image, attempts, error = %last_error, "Giving up on pull, using local image");
            PullOutcome::UsedLocal {
                attempts,
                reason: last_error.to_string(),
            }
        }
        RetryOutcome::Stopped { error, .. } if error.is_tool_missing() => {
            tracing::error!(binary = runtime.binary(), "Container runtime not found");
            PullOutcome::ToolMissing
        }
        RetryOutcome::Stopped { attempts, error } => PullOutcome::UsedLocal {
            attempts,
            reason: error.to_string(),
        },
        RetryOutcome::Cancelled { .. } => {
            tracing::info!(image = %image, "Image pull cancelled");
            PullOutcome::Cancelled
        }
    }
}

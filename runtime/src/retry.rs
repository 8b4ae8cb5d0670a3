//! Bounded retry combinator.
//!
//! The attempt cap and the per-error backoff decision are separate from the
//! operation being retried, so the policy can be tested without a container
//! runtime.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Retry limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,
}

/// Classifier decision for a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Try again after the given pause.
    RetryAfter(Duration),
    /// Give up now; the error is not going to heal itself.
    Stop,
}

/// Outcome of a retry loop.
///
/// A sum type that structurally distinguishes success from each way of
/// giving up.
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    Success { value: T, attempts: u32 },
    /// Every attempt failed with a retryable error.
    Exhausted { attempts: u32, last_error: E },
    /// The classifier stopped the loop.
    Stopped { attempts: u32, error: E },
    Cancelled { attempts: u32 },
}

impl<T, E> RetryOutcome<T, E> {
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts, .. }
            | Self::Exhausted { attempts, .. }
            | Self::Stopped { attempts, .. }
            | Self::Cancelled { attempts } => *attempts,
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Run `operation` until it succeeds, the classifier stops it, the policy's
/// attempt budget is spent, or `cancel` fires.
///
/// `operation` and `classify` receive the 1-based attempt number. No pause
/// follows the final attempt.
pub async fn retry<T, E, Op, Fut, Classify>(
    policy: RetryPolicy,
    cancel: &CancellationToken,
    mut operation: Op,
    mut classify: Classify,
) -> RetryOutcome<T, E>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    Classify: FnMut(&E, u32) -> Verdict,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        if cancel.is_cancelled() {
            return RetryOutcome::Cancelled { attempts: attempt };
        }
        attempt += 1;

        let error = match operation(attempt).await {
            Ok(value) => {
                return RetryOutcome::Success {
                    value,
                    attempts: attempt,
                };
            }
            Err(error) => error,
        };

        let delay = match classify(&error, attempt) {
            Verdict::Stop => {
                return RetryOutcome::Stopped {
                    attempts: attempt,
                    error,
                };
            }
            Verdict::RetryAfter(delay) => delay,
        };

        if attempt >= max_attempts {
            return RetryOutcome::Exhausted {
                attempts: attempt,
                last_error: error,
            };
        }

        tracing::debug!(
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            "Retrying after failed attempt"
        );
        if !delay.is_zero() {
            tokio::select! {
                () = cancel.cancelled() => {
                    return RetryOutcome::Cancelled { attempts: attempt };
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}

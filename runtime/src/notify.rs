//! Operator-facing notices.
//!
//! The lifecycle reports progress and problems through a [`Notifier`]; the
//! binary decides how they reach a human. Three weights exist: a status
//! line, a non-blocking warning, and a modal-style prompt carrying a
//! remediation the operator can act on.

/// Action offered alongside a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remediation {
    /// Point the operator at the configuration file.
    OpenSettings,
}

impl Remediation {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OpenSettings => "Open settings",
        }
    }
}

pub trait Notifier: Send + Sync {
    /// Transient progress or waiting notice.
    fn status(&self, message: &str);

    /// Non-blocking warning; the lifecycle carries on.
    fn warn(&self, message: &str);

    /// Blocking, actionable error.
    fn prompt(&self, message: &str, remediation: Remediation);
}

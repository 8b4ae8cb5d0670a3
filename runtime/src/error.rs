use std::io;

use thiserror::Error;

/// Failure of a single runtime invocation.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The runtime executable could not be found or started.
    #[error("{binary} executable not found")]
    ToolMissing { binary: String },
    /// The runtime ran and exited non-zero.
    #[error("`{binary} {command}` failed ({}): {}", exit_label(*code), stderr.trim())]
    Failed {
        binary: String,
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("failed to run {binary}: {source}")]
    Io {
        binary: String,
        #[source]
        source: io::Error,
    },
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Coarse classification of a [`RuntimeError`], used to pick a retry and
/// reporting policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Executable not installed. User-actionable, not self-healing.
    ToolMissing,
    /// The runtime is installed but its daemon is not accepting requests yet.
    DaemonNotReady,
    /// A create-style command found the object already present.
    AlreadyExists,
    /// Anything else (network, registry, bad arguments).
    Other,
}

/// Substrings the docker and podman CLIs print when their daemon or
/// service socket is unreachable.
const DAEMON_NOT_READY_MARKERS: &[&str] = &[
    "cannot connect to the docker daemon",
    "is the docker daemon running",
    "error during connect",
    "docker daemon is not running",
    "cannot connect to podman",
];

const ALREADY_EXISTS_MARKERS: &[&str] = &["already exists", "is already in use"];

impl RuntimeError {
    #[must_use]
    pub fn classify(&self) -> FailureClass {
        match self {
            Self::ToolMissing { .. } => FailureClass::ToolMissing,
            Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                FailureClass::ToolMissing
            }
            Self::Io { .. } => FailureClass::Other,
            Self::Failed { code, stderr, .. } => {
                let lower = stderr.to_ascii_lowercase();
                if *code == Some(1)
                    && DAEMON_NOT_READY_MARKERS.iter().any(|m| lower.contains(m))
                {
                    FailureClass::DaemonNotReady
                } else if ALREADY_EXISTS_MARKERS.iter().any(|m| lower.contains(m)) {
                    FailureClass::AlreadyExists
                } else {
                    FailureClass::Other
                }
            }
        }
    }

    #[must_use]
    pub fn is_tool_missing(&self) -> bool {
        self.classify() == FailureClass::ToolMissing
    }
}

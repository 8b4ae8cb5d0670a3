//! Resolved server configuration shared across crates.
//!
//! These types represent fully-validated, resolved configuration state.
//! Raw TOML deserialization structs (with `Option` fields) stay in
//! `ers-config`. The config loader resolves them into these types at the
//! parse boundary, once per activation.
//!
//! Existence of a value is the proof of its validity.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ContainerName, ImageReference, VolumeName};

/// Port the server listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 8341;

pub const DEFAULT_HOST: &str = "localhost";

pub const DEFAULT_RUNTIME_BINARY: &str = "docker";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServerConfigError {
    #[error("at least one project root is required")]
    NoProjectRoots,
    #[error("project root '{}' must be an absolute path", .0.display())]
    RelativeProjectRoot(PathBuf),
    #[error("port must be between 1 and 65535")]
    ZeroPort,
    #[error("host must not be empty")]
    EmptyHost,
    #[error("container runtime binary must not be empty")]
    EmptyRuntimeBinary,
    #[error("extra package '{0}' must be a single non-empty word")]
    BadExtraPackage(String),
    #[error("unknown log level '{0}' (expected debug, info or error)")]
    UnknownLogLevel(String),
    #[error("unknown transport '{0}' (expected tcp or attach)")]
    UnknownTransport(String),
}

/// Server-side log level, forwarded as `LOG_LEVEL`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Error,
}

impl LogLevel {
    /// Spelling the server image expects.
    #[must_use]
    pub const fn as_env_value(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Error => "ERROR",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ServerConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "error" => Ok(Self::Error),
            _ => Err(ServerConfigError::UnknownLogLevel(s.to_string())),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = ServerConfigError;

    // `Self::Error` would be ambiguous with the `Error` variant.
    fn try_from(value: String) -> Result<Self, ServerConfigError> {
        value.parse()
    }
}

impl From<LogLevel> for String {
    fn from(value: LogLevel) -> Self {
        value.as_env_value().to_string()
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_env_value())
    }
}

/// How the relay reaches the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TransportMode {
    /// Detached container with a published port; connect over TCP.
    #[default]
    Tcp,
    /// Container runs attached; its stdin/stdout are the stream.
    Attach,
}

impl TransportMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Attach => "attach",
        }
    }
}

impl FromStr for TransportMode {
    type Err = ServerConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tcp" | "socket" => Ok(Self::Tcp),
            "attach" | "stdio" => Ok(Self::Attach),
            _ => Err(ServerConfigError::UnknownTransport(s.to_string())),
        }
    }
}

impl TryFrom<String> for TransportMode {
    type Error = ServerConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TransportMode> for String {
    fn from(value: TransportMode) -> Self {
        value.as_str().to_string()
    }
}

/// Fixed waits used by the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Pause after the runtime reports its daemon is not up yet.
    pub daemon_wait: Duration,
    /// Pause between other failed pull attempts.
    pub retry_backoff: Duration,
    /// Wait after `run` returns, since container start is asynchronous.
    pub settle: Duration,
    /// Single extra wait granted when the readiness probe fails.
    pub probe_grace: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            daemon_wait: Duration::from_secs(10),
            retry_backoff: Duration::from_secs(2),
            settle: Duration::from_secs(5),
            probe_grace: Duration::from_secs(5),
        }
    }
}

impl Timings {
    /// All waits zero. Used by dry runs and tests.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            daemon_wait: Duration::ZERO,
            retry_backoff: Duration::ZERO,
            settle: Duration::ZERO,
            probe_grace: Duration::ZERO,
        }
    }
}

/// Validated configuration for one activation.
///
/// Required identity is supplied to [`ServerConfig::new`]; the rest starts
/// from defaults and is adjusted through the `with_*` methods, each of which
/// re-validates its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    image: ImageReference,
    container: ContainerName,
    volume: VolumeName,
    project_roots: Vec<PathBuf>,
    log_level: LogLevel,
    host: String,
    port: u16,
    extra_packages: Vec<String>,
    transport: TransportMode,
    runtime_binary: String,
    timings: Timings,
}

impl ServerConfig {
    pub fn new(
        image: ImageReference,
        container: ContainerName,
        volume: VolumeName,
        project_roots: Vec<PathBuf>,
    ) -> Result<Self, ServerConfigError> {
        if project_roots.is_empty() {
            return Err(ServerConfigError::NoProjectRoots);
        }
        if let Some(relative) = project_roots.iter().find(|p| !p.is_absolute()) {
            return Err(ServerConfigError::RelativeProjectRoot(relative.clone()));
        }
        Ok(Self {
            image,
            container,
            volume,
            project_roots,
            log_level: LogLevel::default(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            extra_packages: Vec::new(),
            transport: TransportMode::default(),
            runtime_binary: DEFAULT_RUNTIME_BINARY.to_string(),
            timings: Timings::default(),
        })
    }

    pub fn with_port(mut self, port: u16) -> Result<Self, ServerConfigError> {
        if port == 0 {
            return Err(ServerConfigError::ZeroPort);
        }
        self.port = port;
        Ok(self)
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Result<Self, ServerConfigError> {
        let host = host.into();
        if host.trim().is_empty() {
            return Err(ServerConfigError::EmptyHost);
        }
        self.host = host.trim().to_string();
        Ok(self)
    }

    pub fn with_runtime_binary(
        mut self,
        binary: impl Into<String>,
    ) -> Result<Self, ServerConfigError> {
        let binary = binary.into();
        if binary.trim().is_empty() {
            return Err(ServerConfigError::EmptyRuntimeBinary);
        }
        self.runtime_binary = binary.trim().to_string();
        Ok(self)
    }

    pub fn with_extra_packages(
        mut self,
        packages: Vec<String>,
    ) -> Result<Self, ServerConfigError> {
        if let Some(bad) = packages
            .iter()
            .find(|p| p.is_empty() || p.chars().any(|c| c.is_whitespace() || c == ','))
        {
            return Err(ServerConfigError::BadExtraPackage(bad.clone()));
        }
        self.extra_packages = packages;
        Ok(self)
    }

    #[must_use]
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    #[must_use]
    pub fn with_transport(mut self, transport: TransportMode) -> Self {
        self.transport = transport;
        self
    }

    #[must_use]
    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    #[must_use]
    pub fn image(&self) -> &ImageReference {
        &self.image
    }

    #[must_use]
    pub fn container(&self) -> &ContainerName {
        &self.container
    }

    #[must_use]
    pub fn volume(&self) -> &VolumeName {
        &self.volume
    }

    /// Project roots in the order they were supplied.
    #[must_use]
    pub fn project_roots(&self) -> &[PathBuf] {
        &self.project_roots
    }

    #[must_use]
    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn extra_packages(&self) -> &[String] {
        &self.extra_packages
    }

    #[must_use]
    pub fn transport(&self) -> TransportMode {
        self.transport
    }

    #[must_use]
    pub fn runtime_binary(&self) -> &str {
        &self.runtime_binary
    }

    #[must_use]
    pub fn timings(&self) -> &Timings {
        &self.timings
    }

}

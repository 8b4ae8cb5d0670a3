//! `ERS_*` environment overrides.

use std::path::PathBuf;
use std::time::Duration;

use ers_types::{LogLevel, TransportMode};

use crate::{ConfigError, VolumeStrategyKind};

pub const ENV_IMAGE: &str = "ERS_IMAGE";
pub const ENV_CONTAINER: &str = "ERS_CONTAINER";
pub const ENV_VOLUME: &str = "ERS_VOLUME";
pub const ENV_VOLUME_STRATEGY: &str = "ERS_VOLUME_STRATEGY";
pub const ENV_HOST: &str = "ERS_HOST";
pub const ENV_PORT: &str = "ERS_PORT";
pub const ENV_LOG_LEVEL: &str = "ERS_LOG_LEVEL";
pub const ENV_TRANSPORT: &str = "ERS_TRANSPORT";
/// Platform path-list syntax (`:`-separated on Unix).
pub const ENV_PROJECT_ROOTS: &str = "ERS_PROJECT_ROOTS";
/// Space- or comma-separated.
pub const ENV_EXTRA_PACKAGES: &str = "ERS_EXTRA_PACKAGES";
pub const ENV_RUNTIME: &str = "ERS_RUNTIME";
pub const ENV_DAEMON_WAIT_SECS: &str = "ERS_DAEMON_WAIT_SECS";
pub const ENV_RETRY_BACKOFF_SECS: &str = "ERS_RETRY_BACKOFF_SECS";
pub const ENV_SETTLE_SECS: &str = "ERS_SETTLE_SECS";
pub const ENV_PROBE_GRACE_SECS: &str = "ERS_PROBE_GRACE_SECS";

/// Parsed environment overrides. Empty variables count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub image: Option<String>,
    pub container: Option<String>,
    pub volume: Option<String>,
    pub volume_strategy: Option<VolumeStrategyKind>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<LogLevel>,
    pub transport: Option<TransportMode>,
    pub project_roots: Option<Vec<PathBuf>>,
    pub extra_packages: Option<Vec<String>>,
    pub runtime_binary: Option<String>,
    pub daemon_wait: Option<Duration>,
    pub retry_backoff: Option<Duration>,
    pub settle: Option<Duration>,
    pub probe_grace: Option<Duration>,
}

fn invalid(var: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Env {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

impl EnvOverrides {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let parse_secs = |var: &'static str| -> Result<Option<Duration>, ConfigError> {
            get(var)
                .map(|raw| {
                    raw.trim()
                        .parse::<u64>()
                        .map(Duration::from_secs)
                        .map_err(|e| invalid(var, &raw, e))
                })
                .transpose()
        };

        let port = get(ENV_PORT)
            .map(|raw| raw.trim().parse::<u16>().map_err(|e| invalid(ENV_PORT, &raw, e)))
            .transpose()?;
        let log_level = get(ENV_LOG_LEVEL)
            .map(|raw| raw.parse::<LogLevel>().map_err(|e| invalid(ENV_LOG_LEVEL, &raw, e)))
            .transpose()?;
        let transport = get(ENV_TRANSPORT)
            .map(|raw| {
                raw.parse::<TransportMode>()
                    .map_err(|e| invalid(ENV_TRANSPORT, &raw, e))
            })
            .transpose()?;
        let volume_strategy = get(ENV_VOLUME_STRATEGY)
            .map(|raw| {
                raw.parse::<VolumeStrategyKind>()
                    .map_err(|e| invalid(ENV_VOLUME_STRATEGY, &raw, e))
            })
            .transpose()?;

        let project_roots = get(ENV_PROJECT_ROOTS).map(|raw| {
            std::env::split_paths(&raw)
                .filter(|p| !p.as_os_str().is_empty())
                .collect::<Vec<_>>()
        });
        let extra_packages = get(ENV_EXTRA_PACKAGES).map(|raw| {
            raw.split(|c: char| c == ',' || c.is_whitespace())
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        });

        Ok(Self {
            image: get(ENV_IMAGE),
            container: get(ENV_CONTAINER),
            volume: get(ENV_VOLUME),
            volume_strategy,
            host: get(ENV_HOST),
            port,
            log_level,
            transport,
            project_roots,
            extra_packages,
            runtime_binary: get(ENV_RUNTIME),
            daemon_wait: parse_secs(ENV_DAEMON_WAIT_SECS)?,
            retry_backoff: parse_secs(ENV_RETRY_BACKOFF_SECS)?,
            settle: parse_secs(ENV_SETTLE_SECS)?,
            probe_grace: parse_secs(ENV_PROBE_GRACE_SECS)?,
        })
    }
}

//! Merge file, environment and flags into a validated [`ServerConfig`].
//!
//! Precedence, highest first: command line, environment, config file,
//! built-in default. Project roots default to the working directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ers_types::{ContainerName, ImageReference, ServerConfig, Timings, VolumeName};

use crate::{
    ConfigError, DEFAULT_VOLUME_TAG, EnvOverrides, ErsConfig, PathHash, VersionTag,
    VolumeIdStrategy, VolumeStrategyKind, expand_env_vars,
};

pub const DEFAULT_IMAGE: &str = "blinknlights/elastic_ruby_server";
pub const DEFAULT_CONTAINER: &str = "elastic-ruby-server";

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// Relative paths are taken relative to the working directory.
    pub project_roots: Vec<PathBuf>,
}

fn absolutize(path: PathBuf, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}

fn project_roots(
    file: &ErsConfig,
    env: &EnvOverrides,
    cli: &CliOverrides,
    cwd: &Path,
) -> Vec<PathBuf> {
    if !cli.project_roots.is_empty() {
        return cli
            .project_roots
            .iter()
            .cloned()
            .map(|p| absolutize(p, cwd))
            .collect();
    }
    if let Some(roots) = env.project_roots.clone() {
        return roots;
    }
    if let Some(roots) = file.server.as_ref().and_then(|s| s.project_roots.as_ref()) {
        return roots
            .iter()
            .map(|r| PathBuf::from(expand_env_vars(r)))
            .collect();
    }
    vec![cwd.to_path_buf()]
}

fn volume_name(
    file: &ErsConfig,
    env: &EnvOverrides,
    roots: &[PathBuf],
) -> Result<VolumeName, ConfigError> {
    let section = file.server.as_ref().and_then(|s| s.volume.as_ref());

    if let Some(name) = env
        .volume
        .clone()
        .or_else(|| section.and_then(|v| v.name.as_deref()).map(expand_env_vars))
    {
        return VolumeName::new(name).map_err(|source| ConfigError::Name {
            field: "volume",
            source,
        });
    }

    let kind = env
        .volume_strategy
        .or_else(|| section.and_then(|v| v.strategy))
        .unwrap_or_default();
    let id = match kind {
        VolumeStrategyKind::VersionTag => VersionTag(
            section
                .and_then(|v| v.tag.clone())
                .unwrap_or_else(|| DEFAULT_VOLUME_TAG.to_string()),
        )
        .compute_volume_id(roots),
        VolumeStrategyKind::PathHash => PathHash.compute_volume_id(roots),
    };
    id.map_err(|source| ConfigError::Name {
        field: "volume",
        source,
    })
}

fn timings(file: &ErsConfig, env: &EnvOverrides) -> Timings {
    let defaults = Timings::default();
    let section = file.timings.as_ref();
    let pick = |env_value: Option<Duration>, file_secs: Option<u64>, default: Duration| {
        env_value
            .or_else(|| file_secs.map(Duration::from_secs))
            .unwrap_or(default)
    };
    Timings {
        daemon_wait: pick(
            env.daemon_wait,
            section.and_then(|t| t.daemon_wait_secs),
            defaults.daemon_wait,
        ),
        retry_backoff: pick(
            env.retry_backoff,
            section.and_then(|t| t.retry_backoff_secs),
            defaults.retry_backoff,
        ),
        settle: pick(
            env.settle,
            section.and_then(|t| t.settle_secs),
            defaults.settle,
        ),
        probe_grace: pick(
            env.probe_grace,
            section.and_then(|t| t.probe_grace_secs),
            defaults.probe_grace,
        ),
    }
}

/// Build the activation's [`ServerConfig`]. Fails on the first invalid
/// value; nothing is defaulted silently past a bad input.
pub fn resolve(
    file: &ErsConfig,
    env: &EnvOverrides,
    cli: &CliOverrides,
    cwd: &Path,
) -> Result<ServerConfig, ConfigError> {
    let server = file.server.as_ref();

    let image = env
        .image
        .clone()
        .or_else(|| server.and_then(|s| s.image.as_deref()).map(expand_env_vars))
        .unwrap_or_else(|| DEFAULT_IMAGE.to_string());
    let image = ImageReference::new(image).map_err(|source| ConfigError::Name {
        field: "image",
        source,
    })?;

    let container = env
        .container
        .clone()
        .or_else(|| server.and_then(|s| s.container.clone()))
        .unwrap_or_else(|| DEFAULT_CONTAINER.to_string());
    let container = ContainerName::new(container).map_err(|source| ConfigError::Name {
        field: "container",
        source,
    })?;

    let roots = project_roots(file, env, cli, cwd);
    let volume = volume_name(file, env, &roots)?;

    let mut config = ServerConfig::new(image, container, volume, roots)?
        .with_timings(timings(file, env));

    if let Some(port) = env.port.or_else(|| server.and_then(|s| s.port)) {
        config = config.with_port(port)?;
    }
    if let Some(host) = env
        .host
        .clone()
        .or_else(|| server.and_then(|s| s.host.clone()))
    {
        config = config.with_host(host)?;
    }
    if let Some(level) = env.log_level.or_else(|| server.and_then(|s| s.log_level)) {
        config = config.with_log_level(level);
    }
    if let Some(transport) = env.transport.or_else(|| server.and_then(|s| s.transport)) {
        config = config.with_transport(transport);
    }
    if let Some(packages) = env
        .extra_packages
        .clone()
        .or_else(|| server.and_then(|s| s.extra_packages.clone()))
    {
        config = config.with_extra_packages(packages)?;
    }
    if let Some(binary) = env
        .runtime_binary
        .clone()
        .or_else(|| file.runtime.as_ref().and_then(|r| r.binary.clone()))
    {
        config = config.with_runtime_binary(binary)?;
    }

    tracing::debug!(
        image = %config.image(),
        container = %config.container(),
        volume = %config.volume(),
        port = config.port(),
        transport = config.transport().as_str(),
        roots = config.project_roots().len(),
        "Resolved server config"
    );
    Ok(config)
}

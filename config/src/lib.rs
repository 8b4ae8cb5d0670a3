//! Configuration for ers.
//!
//! `~/.ers/config.toml` is optional and every field in it is optional. Raw
//! values from the file, `ERS_*` environment variables and command-line
//! flags are merged and validated by [`resolve`] into an
//! [`ers_types::ServerConfig`], once per activation.

mod env;
mod identity;
mod resolve;

use std::io;
use std::path::{Path, PathBuf};

use ers_types::{LogLevel, NameError, ServerConfigError, TransportMode};
use serde::Deserialize;
use thiserror::Error;

pub use env::{
    ENV_CONTAINER, ENV_DAEMON_WAIT_SECS, ENV_EXTRA_PACKAGES, ENV_HOST, ENV_IMAGE, ENV_LOG_LEVEL,
    ENV_PORT, ENV_PROBE_GRACE_SECS, ENV_PROJECT_ROOTS, ENV_RETRY_BACKOFF_SECS, ENV_RUNTIME,
    ENV_SETTLE_SECS, ENV_TRANSPORT, ENV_VOLUME, ENV_VOLUME_STRATEGY, EnvOverrides,
};
pub use identity::{
    DEFAULT_VOLUME_TAG, PathHash, VersionTag, VolumeIdStrategy, VolumeStrategyKind,
};
pub use resolve::{CliOverrides, DEFAULT_CONTAINER, DEFAULT_IMAGE, resolve};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{var}='{value}': {reason}")]
    Env {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("invalid {field}: {source}")]
    Name {
        field: &'static str,
        #[source]
        source: NameError,
    },
    #[error(transparent)]
    Invalid(#[from] ServerConfigError),
}

impl ConfigError {
    /// Config file the error came from, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } => Some(path),
            Self::Env { .. } | Self::Name { .. } | Self::Invalid(_) => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ErsConfig {
    pub server: Option<ServerSection>,
    pub runtime: Option<RuntimeSection>,
    pub timings: Option<TimingsSection>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServerSection {
    pub image: Option<String>,
    pub container: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<LogLevel>,
    pub transport: Option<TransportMode>,
    /// Absolute host paths; `${VAR}` is expanded.
    pub project_roots: Option<Vec<String>>,
    /// Forwarded to the container as `EXTRA_PACKAGES`.
    pub extra_packages: Option<Vec<String>>,
    pub volume: Option<VolumeSection>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VolumeSection {
    pub strategy: Option<VolumeStrategyKind>,
    /// Name used by the `version-tag` strategy.
    pub tag: Option<String>,
    /// Explicit name; bypasses the strategy.
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RuntimeSection {
    /// Container runtime executable, e.g. `podman`.
    pub binary: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TimingsSection {
    pub daemon_wait_secs: Option<u64>,
    pub retry_backoff_secs: Option<u64>,
    pub settle_secs: Option<u64>,
    pub probe_grace_secs: Option<u64>,
}

impl ErsConfig {
    /// Load from the default location. A missing file is `Ok(None)`.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    /// Load from `path`. A missing file is `Ok(None)`.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file");
                return Ok(None);
            }
            Err(source) => {
                tracing::warn!(path = %path.display(), error = %source, "Failed to read config");
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        toml::from_str(&content).map(Some).map_err(|source| {
            tracing::warn!(path = %path.display(), error = %source, "Failed to parse config");
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })
    }
}

/// `~/.ers`, home of the config file and the log directory.
#[must_use]
pub fn ers_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".ers"))
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    ers_dir().map(|dir| dir.join("config.toml"))
}

/// Replace `${VAR}` with the variable's value from the process environment.
/// Unset variables become empty; an unclosed `${` is kept literally.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    expand_with(value, |name| std::env::var(name).ok())
}

/// [`expand_env_vars`] against an arbitrary lookup.
pub fn expand_with(value: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        if !name.is_empty()
            && let Some(replacement) = lookup(name)
        {
            out.push_str(&replacement);
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn expand_without_vars_is_identity() {
        assert_eq!(expand_with("/home/u/app", lookup(&[])), "/home/u/app");
    }

    #[test]
    fn expand_replaces_known_and_blanks_unknown() {
        let env = lookup(&[("HOME", "/home/u"), ("A", "x")]);
        assert_eq!(expand_with("${HOME}/app", &env), "/home/u/app");
        assert_eq!(expand_with("${A}${A}-${MISSING}!", &env), "xx-!");
    }

    #[test]
    fn expand_keeps_unclosed_and_drops_empty_name() {
        let env = lookup(&[("A", "x")]);
        assert_eq!(expand_with("a ${A} ${UNCLOSED", &env), "a x ${UNCLOSED");
        assert_eq!(expand_with("a ${} b", &env), "a  b");
    }

    #[test]
    fn expand_handles_multibyte_text() {
        let env = lookup(&[("CRAB", "🦀")]);
        assert_eq!(expand_with("é ${CRAB} ü", &env), "é 🦀 ü");
    }

    #[test]
    fn parse_empty_config() {
        let config: ErsConfig = toml::from_str("").unwrap();
        assert!(config.server.is_none());
        assert!(config.runtime.is_none());
        assert!(config.timings.is_none());
    }

    #[test]
    fn parse_full_config() {
        let config: ErsConfig = toml::from_str(
            r#"
            [server]
            image = "blinknlights/elastic_ruby_server:0.2.0"
            container = "ers-dev"
            port = 9000
            log_level = "debug"
            transport = "attach"
            project_roots = ["/home/u/app", "${HOME}/lib"]
            extra_packages = ["rails", "rspec"]

            [server.volume]
            strategy = "path-hash"

            [runtime]
            binary = "podman"

            [timings]
            settle_secs = 1
            "#,
        )
        .unwrap();

        let server = config.server.unwrap();
        assert_eq!(server.port, Some(9000));
        assert_eq!(server.log_level, Some(LogLevel::Debug));
        assert_eq!(server.transport, Some(TransportMode::Attach));
        assert_eq!(server.project_roots.unwrap().len(), 2);
        assert_eq!(
            server.volume.unwrap().strategy,
            Some(VolumeStrategyKind::PathHash)
        );
        assert_eq!(config.runtime.unwrap().binary.as_deref(), Some("podman"));
        assert_eq!(config.timings.unwrap().settle_secs, Some(1));
    }

    #[test]
    fn parse_rejects_bad_enum_values() {
        assert!(toml::from_str::<ErsConfig>("[server]\nlog_level = \"loud\"").is_err());
        assert!(toml::from_str::<ErsConfig>("[server]\nport = 70000").is_err());
    }

    #[test]
    fn load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(
            ErsConfig::load_from(&dir.path().join("config.toml"))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn load_reports_parse_error_with_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = ").unwrap();
        let err = ErsConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(err.path(), Some(file.path()));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[runtime]\nbinary = \"nerdctl\"").unwrap();
        let config = ErsConfig::load_from(file.path()).unwrap().unwrap();
        assert_eq!(config.runtime.unwrap().binary.as_deref(), Some("nerdctl"));
    }

    #[test]
    fn config_lives_under_dot_ers() {
        if let Some(path) = config_path() {
            assert!(path.ends_with(".ers/config.toml"));
        }
    }
}

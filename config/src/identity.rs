//! Index volume naming.

use std::path::PathBuf;

use ers_types::{NameError, VolumeName};
use serde::Deserialize;
use sha2::{Digest, Sha256};

/// Volume name shipped with server image 0.2.0. Every workspace shares it.
pub const DEFAULT_VOLUME_TAG: &str = "elastic_ruby_server-0.2.0";

const PATH_HASH_PREFIX: &str = "erv-";
const PATH_HASH_HEX_LEN: usize = 12;

/// Derives the index volume name from the project roots.
///
/// Must be a pure function of its input: the same roots always name the
/// same volume, across processes and restarts.
pub trait VolumeIdStrategy {
    fn compute_volume_id(&self, project_roots: &[PathBuf]) -> Result<VolumeName, NameError>;
}

/// One fixed name regardless of roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTag(pub String);

impl Default for VersionTag {
    fn default() -> Self {
        Self(DEFAULT_VOLUME_TAG.to_string())
    }
}

impl VolumeIdStrategy for VersionTag {
    fn compute_volume_id(&self, _project_roots: &[PathBuf]) -> Result<VolumeName, NameError> {
        VolumeName::new(self.0.clone())
    }
}

/// `erv-` plus the first 12 hex digits of SHA-256 over the newline-joined
/// roots. Order matters: `[a, b]` and `[b, a]` are different workspaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathHash;

impl VolumeIdStrategy for PathHash {
    fn compute_volume_id(&self, project_roots: &[PathBuf]) -> Result<VolumeName, NameError> {
        let joined = project_roots
            .iter()
            .map(|p| p.to_string_lossy())
            .collect::<Vec<_>>()
            .join("\n");
        let digest = Sha256::digest(joined.as_bytes());
        let hex = format!("{digest:x}");
        VolumeName::new(format!("{PATH_HASH_PREFIX}{}", &hex[..PATH_HASH_HEX_LEN]))
    }
}

/// Strategy as written in the config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VolumeStrategyKind {
    #[default]
    VersionTag,
    PathHash,
}

impl std::str::FromStr for VolumeStrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "version-tag" | "tag" => Ok(Self::VersionTag),
            "path-hash" | "hash" => Ok(Self::PathHash),
            other => Err(format!(
                "unknown volume strategy '{other}' (expected version-tag or path-hash)"
            )),
        }
    }
}

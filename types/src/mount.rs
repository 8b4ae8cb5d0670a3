//! Read-only bind mounts for project roots.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Directory inside the container under which project roots are mounted.
pub const PROJECTS_MOUNT_ROOT: &str = "/projects";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MountPathError {
    #[error("project root '{}' has no final path segment to use as a mount name", path.display())]
    NoFinalSegment { path: PathBuf },
    #[error("project root '{}' is not valid UTF-8", path.display())]
    NotUtf8 { path: PathBuf },
    /// `,` separates fields of `--mount` and entries of `HOST_PROJECT_ROOTS`.
    #[error("project root '{}' contains a comma", path.display())]
    Comma { path: PathBuf },
    #[error(
        "project roots '{}' and '{}' would both mount at {PROJECTS_MOUNT_ROOT}/{name}",
        first.display(),
        second.display()
    )]
    DuplicateName {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// A project root projected into the container.
///
/// Invariant: `mount_name` is non-empty and contains no separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    host_path: PathBuf,
    mount_name: String,
}

impl MountSpec {
    /// Derive the mount from a host path. The mount name is the final
    /// path segment; a trailing separator is ignored.
    pub fn from_host_path(path: &Path) -> Result<Self, MountPathError> {
        let segment = path
            .file_name()
            .ok_or_else(|| MountPathError::NoFinalSegment {
                path: path.to_path_buf(),
            })?;
        let name = segment.to_str().ok_or_else(|| MountPathError::NotUtf8 {
            path: path.to_path_buf(),
        })?;
        let Some(full) = path.to_str() else {
            return Err(MountPathError::NotUtf8 {
                path: path.to_path_buf(),
            });
        };
        if full.contains(',') {
            return Err(MountPathError::Comma {
                path: path.to_path_buf(),
            });
        }
        Ok(Self {
            host_path: path.to_path_buf(),
            mount_name: name.to_string(),
        })
    }

    #[must_use]
    pub fn host_path(&self) -> &Path {
        &self.host_path
    }

    #[must_use]
    pub fn mount_name(&self) -> &str {
        &self.mount_name
    }

    /// Absolute target path inside the container.
    #[must_use]
    pub fn target(&self) -> String {
        format!("{PROJECTS_MOUNT_ROOT}/{}", self.mount_name)
    }

    /// The `--mount` value. Always read-only.
    #[must_use]
    pub fn to_mount_arg(&self) -> String {
        format!(
            "type=bind,source={},target={},readonly",
            self.host_path.display(),
            self.target()
        )
    }
}

/// Derive one mount per root, preserving order.
///
/// Fails on the first root without a usable name, or when two roots would
/// collide on the same target.
pub fn derive_mounts(roots: &[PathBuf]) -> Result<Vec<MountSpec>, MountPathError> {
    let mut mounts: Vec<MountSpec> = Vec::with_capacity(roots.len());
    for root in roots {
        let mount = MountSpec::from_host_path(root)?;
        if let Some(existing) = mounts.iter().find(|m| m.mount_name == mount.mount_name) {
            return Err(MountPathError::DuplicateName {
                name: mount.mount_name,
                first: existing.host_path.clone(),
                second: mount.host_path,
            });
        }
        mounts.push(mount);
    }
    Ok(mounts)
}

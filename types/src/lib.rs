//! Core domain types for ers.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod mount;
mod settings;

pub use mount::{MountPathError, MountSpec, PROJECTS_MOUNT_ROOT, derive_mounts};
pub use settings::{
    DEFAULT_HOST, DEFAULT_PORT, DEFAULT_RUNTIME_BINARY, LogLevel, ServerConfig, ServerConfigError,
    Timings, TransportMode,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Runtime Object Names
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("{kind} must not be empty")]
    Empty { kind: &'static str },
    #[error("{kind} '{value}' contains whitespace")]
    Whitespace { kind: &'static str, value: String },
    #[error("{kind} '{value}' must start with an ASCII letter or digit")]
    BadStart { kind: &'static str, value: String },
    #[error("{kind} '{value}' contains '{ch}'; only [A-Za-z0-9_.-] is allowed")]
    BadChar {
        kind: &'static str,
        value: String,
        ch: char,
    },
}

/// Docker object names (containers, volumes) follow `[a-zA-Z0-9][a-zA-Z0-9_.-]*`.
fn validate_object_name(kind: &'static str, value: &str) -> Result<(), NameError> {
    let Some(first) = value.chars().next() else {
        return Err(NameError::Empty { kind });
    };
    if !first.is_ascii_alphanumeric() {
        return Err(NameError::BadStart {
            kind,
            value: value.to_string(),
        });
    }
    if let Some(ch) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')))
    {
        return Err(NameError::BadChar {
            kind,
            value: value.to_string(),
            ch,
        });
    }
    Ok(())
}

macro_rules! object_name {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Result<Self, NameError> {
                let value = value.into();
                validate_object_name($kind, &value)?;
                Ok(Self(value))
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = NameError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = NameError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

object_name!(
    /// Name of the server container. The container is never owned: every
    /// question about it is answered by asking the runtime.
    ContainerName,
    "container name"
);

object_name!(
    /// Name of the persistent volume holding the server's index data.
    VolumeName,
    "volume name"
);

/// An image reference such as `blinknlights/elastic_ruby_server:latest`.
///
/// Only emptiness and whitespace are checked; registry syntax is the
/// runtime's business.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageReference(String);

impl ImageReference {
    pub fn new(value: impl Into<String>) -> Result<Self, NameError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(NameError::Empty {
                kind: "image reference",
            });
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(NameError::Whitespace {
                kind: "image reference",
                value: value.clone(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ImageReference {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ImageReference> for String {
    fn from(value: ImageReference) -> Self {
        value.0
    }
}

impl std::fmt::Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

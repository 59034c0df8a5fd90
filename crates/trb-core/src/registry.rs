//! The release registry.
//!
//! A JSON array of release descriptors, newest first. Order carries
//! meaning: the first entry is the latest release, and `load` rejects a
//! file whose versions are not strictly descending so "first" and
//! "newest" can never drift apart.

use std::path::{Path, PathBuf};

use thiserror::Error;
use trb_schema::{ReleaseDescriptor, TorVersion};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Cannot read registry at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed registry at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Registry has no entries")]
    Empty,

    #[error("Registry entries out of order: {prev} appears before {next}")]
    Unordered { prev: TorVersion, next: TorVersion },

    #[error("Unknown version '{0}'")]
    UnknownVersion(String),
}

/// All known releases, newest first.
#[derive(Debug, Clone)]
pub struct Registry {
    entries: Vec<ReleaseDescriptor>,
}

impl Registry {
    /// Load and validate a registry file.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Io`] / [`RegistryError::Parse`] for
    /// unreadable or malformed files, [`RegistryError::Empty`] for an
    /// empty array, and [`RegistryError::Unordered`] if versions are not
    /// strictly descending.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let raw = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: Vec<ReleaseDescriptor> =
            serde_json::from_str(&raw).map_err(|source| RegistryError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_entries(entries)
    }

    /// Build a registry from descriptors already in memory.
    ///
    /// # Errors
    ///
    /// Same ordering and non-emptiness validation as [`Registry::load`].
    pub fn from_entries(entries: Vec<ReleaseDescriptor>) -> Result<Self, RegistryError> {
        if entries.is_empty() {
            return Err(RegistryError::Empty);
        }
        for pair in entries.windows(2) {
            if pair[0].version <= pair[1].version {
                return Err(RegistryError::Unordered {
                    prev: pair[0].version,
                    next: pair[1].version,
                });
            }
        }
        Ok(Self { entries })
    }

    /// The newest release.
    pub fn latest(&self) -> &ReleaseDescriptor {
        // from_entries rejects empty registries
        &self.entries[0]
    }

    /// Resolve an optional version tag. `None` and the literal string
    /// `latest` both mean the newest release.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownVersion`] when no entry matches.
    pub fn resolve(&self, tag: Option<&str>) -> Result<&ReleaseDescriptor, RegistryError> {
        let Some(tag) = tag else {
            return Ok(self.latest());
        };
        if tag == "latest" {
            return Ok(self.latest());
        }
        let wanted: TorVersion = tag
            .parse()
            .map_err(|_| RegistryError::UnknownVersion(tag.to_string()))?;
        self.entries
            .iter()
            .find(|entry| entry.version == wanted)
            .ok_or_else(|| RegistryError::UnknownVersion(tag.to_string()))
    }

    /// All entries, newest first.
    pub fn entries(&self) -> &[ReleaseDescriptor] {
        &self.entries
    }
}

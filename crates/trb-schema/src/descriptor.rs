//! Release descriptors: the pinned inputs that make a build reproducible.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::hash::Sha256Digest;
use crate::version::TorVersion;

/// Well-known dependency names used by the build drivers.
pub mod deps {
    /// The Tor daemon itself.
    pub const TOR: &str = "tor";
    /// The event notification library Tor links against.
    pub const LIBEVENT: &str = "libevent";
    /// OpenSSL, built statically per target.
    pub const OPENSSL: &str = "openssl";
    /// xz / liblzma for compressed consensus documents.
    pub const XZ: &str = "xz";
    /// zlib compression library.
    pub const ZLIB: &str = "zlib";
    /// zstd compression library.
    pub const ZSTD: &str = "zstd";
    /// The tor-android make harness wrapping the NDK toolchain.
    pub const TOR_ANDROID: &str = "tor-android";
}

/// The fixed moment a release is canonically "built at".
///
/// Stored in the registry as a `touch -t` style string
/// (`YYYYMMDDhhmm.SS`, UTC). This one value drives `SOURCE_DATE_EPOCH`,
/// archive entry times, and mtime normalization, so two builds of the
/// same release agree on every embedded timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildTimestamp(NaiveDateTime);

/// Errors raised when parsing a build timestamp.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("Invalid build timestamp '{0}': expected YYYYMMDDhhmm.SS")]
pub struct TimestampError(String);

impl BuildTimestamp {
    /// `touch -t` layout: `YYYYMMDDhhmm.SS`.
    pub const FORMAT: &'static str = "%Y%m%d%H%M.%S";

    /// Parse a `YYYYMMDDhhmm.SS` string, interpreted as UTC.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError`] if the string does not match the layout.
    pub fn parse(s: &str) -> Result<Self, TimestampError> {
        NaiveDateTime::parse_from_str(s, Self::FORMAT)
            .map(Self)
            .map_err(|_| TimestampError(s.to_string()))
    }

    /// Seconds since the Unix epoch, for `SOURCE_DATE_EPOCH`.
    pub fn unix_epoch(self) -> i64 {
        self.0.and_utc().timestamp()
    }

    /// The wall-clock moment, for archive entry times.
    pub fn datetime(self) -> NaiveDateTime {
        self.0
    }
}

impl std::fmt::Display for BuildTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(Self::FORMAT))
    }
}

impl Serialize for BuildTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BuildTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A git source tree pinned to an exact revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyPin {
    /// Clone URL of the upstream repository.
    pub url: String,
    /// Tag or commit to check out.
    pub revision: String,
}

/// The Android NDK release a build uses, pinned by revision and digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NdkSpec {
    /// Download URL of the NDK zip.
    pub url: String,
    /// `Pkg.Revision` expected in the unpacked `source.properties`.
    pub revision: String,
    /// SHA256 of the zip, enforced on download.
    pub sha256: Sha256Digest,
}

/// Everything needed to reproduce one Tor release: the version, its
/// canonical build time, every pinned source tree, the Android patches,
/// and the NDK. Resolved once from the registry and then read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDescriptor {
    /// The Tor release version.
    pub version: TorVersion,
    /// Canonical build time driving all timestamp normalization.
    pub timestamp: BuildTimestamp,
    /// Pinned source trees, keyed by dependency name.
    pub dependencies: BTreeMap<String, DependencyPin>,
    /// Upstream commit ids applied to the tor tree before Android builds.
    #[serde(default)]
    pub android_patches: Vec<String>,
    /// The pinned NDK release.
    pub ndk: NdkSpec,
}

/// Errors raised when reading a descriptor.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum DescriptorError {
    /// The descriptor has no pin for the named dependency.
    #[error("Release {version} has no pin for dependency '{name}'")]
    MissingDependency {
        /// The release the pin was requested for.
        version: TorVersion,
        /// The dependency name that was looked up.
        name: String,
    },
}

impl ReleaseDescriptor {
    /// Look up the pin for a dependency by name.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::MissingDependency`] if the registry
    /// entry lacks the dependency.
    pub fn pin(&self, name: &str) -> Result<&DependencyPin, DescriptorError> {
        self.dependencies
            .get(name)
            .ok_or_else(|| DescriptorError::MissingDependency {
                version: self.version,
                name: name.to_string(),
            })
    }

    /// `SOURCE_DATE_EPOCH` value for this release.
    pub fn source_date_epoch(&self) -> String {
        self.timestamp.unix_epoch().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTRY: &str = r#"{
        "version": "0.4.8.21",
        "timestamp": "201001010000.00",
        "dependencies": {
            "tor": { "url": "https://gitlab.torproject.org/tpo/core/tor.git", "revision": "tor-0.4.8.21" },
            "zlib": { "url": "https://github.com/madler/zlib.git", "revision": "v1.3.1" }
        },
        "android_patches": ["6522c8a2ae9b2f9c4c488188f88d38728ee487a7"],
        "ndk": {
            "url": "https://dl.google.com/android/repository/android-ndk-r25c-linux.zip",
            "revision": "25.2.9519653",
            "sha256": "769ee342ea75f80619d985c2da990c48b3d8eaf45f48783a2d48870d04b46108"
        }
    }"#;

    #[test]
    fn deserializes_registry_entry() {
        let d: ReleaseDescriptor = serde_json::from_str(ENTRY).unwrap();
        assert_eq!(d.version.to_string(), "0.4.8.21");
        assert_eq!(d.pin("zlib").unwrap().revision, "v1.3.1");
        assert_eq!(d.android_patches.len(), 1);
    }

    #[test]
    fn missing_pin_is_a_typed_error() {
        let d: ReleaseDescriptor = serde_json::from_str(ENTRY).unwrap();
        let err = d.pin("libevent").unwrap_err();
        assert!(matches!(
            err,
            DescriptorError::MissingDependency { ref name, .. } if name == "libevent"
        ));
    }

    #[test]
    fn timestamp_parses_touch_format() {
        let ts = BuildTimestamp::parse("201001010000.00").unwrap();
        assert_eq!(ts.unix_epoch(), 1_262_304_000);
        assert_eq!(ts.to_string(), "201001010000.00");
    }

    #[test]
    fn timestamp_rejects_garbage() {
        assert!(BuildTimestamp::parse("2010-01-01").is_err());
        assert!(BuildTimestamp::parse("").is_err());
    }

    #[test]
    fn patches_default_to_empty() {
        let no_patches = ENTRY.replace(
            "\"android_patches\": [\"6522c8a2ae9b2f9c4c488188f88d38728ee487a7\"],",
            "",
        );
        let d: ReleaseDescriptor = serde_json::from_str(&no_patches).unwrap();
        assert!(d.android_patches.is_empty());
    }
}

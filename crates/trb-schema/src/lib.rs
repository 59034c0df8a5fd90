//! Shared types for the Tor reproducible build pipeline.
//!
//! Everything here is plain data: platform families, four-part Tor
//! versions, validated digests, release descriptors, and the artifact
//! naming scheme. No I/O lives in this crate.

pub mod descriptor;
pub mod hash;
pub mod naming;
pub mod platform;
pub mod version;

// Re-exports
pub use descriptor::{BuildTimestamp, DependencyPin, NdkSpec, ReleaseDescriptor, deps};
pub use hash::Sha256Digest;
pub use naming::{artifact_id, bundle_file_name, pom_file_name, sources_file_name};
pub use platform::Platform;
pub use version::TorVersion;

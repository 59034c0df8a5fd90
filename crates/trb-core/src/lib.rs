//! Core library for trb: the reproducible Tor build pipeline.
//!
//! Source pinning, normalized build environments, per-platform
//! cross-compilation drivers, deterministic packaging, and the
//! verification protocol. The `trb` binary in `trb-cli` is a thin
//! front-end over this crate.
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]

pub mod archive;
pub mod build;
pub mod download;
pub mod env;
pub mod hashing;
pub mod ndk;
pub mod packaging;
pub mod paths;
pub mod pipeline;
pub mod process;
pub mod registry;
pub mod sources;
pub mod verify;

pub use pipeline::{BuildReport, PipelineError, run_build};
pub use verify::{Mirrors, VerifyOutcome, verify_all, verify_platform};

/// User Agent string for downloads
pub const USER_AGENT: &str = concat!("trb/", env!("CARGO_PKG_VERSION"));

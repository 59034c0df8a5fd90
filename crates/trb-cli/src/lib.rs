//! trb - Tor Reproducible Builds
//!
//! Cross-compiles the Tor daemon and its native dependencies for
//! Android, Linux and Windows, packages the binaries into deterministic
//! release bundles, and verifies local builds bit-for-bit against the
//! published artifacts.
//!
//! # Directory Layout
//!
//! ```text
//! $TRB_HOME/
//! ├── build/              # Pinned source trees and the install prefix
//! ├── out/                # Bundles, sources jars and POM files
//! │   └── <platform>/     # Per-architecture zips and geoip.zip
//! ├── reference/          # Downloaded reference bundles
//! ├── android-ndk/        # Unpacked NDK matching the release pin
//! ├── templates/          # POM templates, one per platform
//! └── tor-versions.json   # Release registry, newest first
//! ```
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]

pub mod cmd;
pub mod ui;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "trb")]
#[command(author, version, about = "trb - reproducible Tor binaries")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build release bundles for one platform, or all of them
    Build {
        /// Platform to build: android, linux, windows or all
        platform: String,
        /// Version to build, defaults to the newest registry entry
        version: Option<String>,
    },
    /// Rebuild a release and compare it against the published bundle
    Verify {
        /// Version to verify, defaults to the newest registry entry
        version: Option<String>,
        /// Verify a single platform instead of all of them
        #[arg(long)]
        platform: Option<String>,
    },
    /// List the releases the registry knows about
    Versions,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

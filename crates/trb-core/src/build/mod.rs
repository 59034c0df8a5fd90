//! Cross-compilation drivers.
//!
//! One submodule per platform family. Every driver follows the same
//! shape: re-clean the source trees, recreate the shared install
//! prefix, build the static dependency chain bottom-up, then configure
//! and build the daemon against it. The helpers here hold the pieces
//! all three share.

use std::path::{Path, PathBuf};

use thiserror::Error;
use trb_schema::BuildTimestamp;

use crate::archive::{ArchiveError, DeterministicZip};
use crate::env::BuildEnv;
use crate::hashing;
use crate::ndk::NdkError;
use crate::process::{CommandError, ExternalCommand};
use crate::sources::SourceError;

pub mod android;
pub mod linux;
pub mod windows;

/// Configure flags shared by every daemon build.
pub const TOR_CONFIGURE_FLAGS: &str = "--disable-asciidoc --disable-manpage \
    --disable-html-manual --disable-systemd --disable-unittests";

/// Configure flags for liblzma: static library only, no tools or docs.
pub const XZ_CONFIGURE_FLAGS: &str = "--disable-doc --disable-scripts --disable-xz \
    --disable-xzdec --disable-lzmadec --disable-lzmainfo --disable-lzma-links \
    --disable-shared --enable-static";

/// Protocol and feature trim applied to every OpenSSL Configure run.
pub const OPENSSL_CONFIGURE_FLAGS: &str =
    "no-comp no-dtls no-engine no-psk no-srp no-ssl3 no-weak-ssl-ciphers";

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Ndk(#[from] NdkError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> BuildError {
    let path = path.to_path_buf();
    move |source| BuildError::Io { path, source }
}

/// The shared static-library install prefix under the build directory.
///
/// Wiped and recreated at the start of every arch so no object from a
/// previous target can leak into the next link.
#[derive(Debug, Clone)]
pub struct InstallPrefix {
    root: PathBuf,
}

impl InstallPrefix {
    /// Remove any leftover prefix under `build_dir` and create a fresh
    /// one with empty `lib/` and `include/` directories.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Io`] naming the prefix path.
    pub fn create_fresh(build_dir: &Path) -> Result<Self, BuildError> {
        let root = build_dir.join("prefix");
        if root.exists() {
            std::fs::remove_dir_all(&root).map_err(io_err(&root))?;
        }
        std::fs::create_dir_all(root.join("lib")).map_err(io_err(&root))?;
        std::fs::create_dir_all(root.join("include")).map_err(io_err(&root))?;
        // configure scripts need absolute --prefix paths
        let root = root.canonicalize().map_err(io_err(&root))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn lib(&self) -> PathBuf {
        self.root.join("lib")
    }

    pub fn include(&self) -> PathBuf {
        self.root.join("include")
    }
}

/// `make -j` width.
pub(crate) fn jobs() -> String {
    num_cpus::get().to_string()
}

pub(crate) fn autogen(dir: &Path, env: &BuildEnv) -> Result<(), CommandError> {
    ExternalCommand::new("./autogen.sh")
        .current_dir(dir)
        .envs(env.vars())
        .run()
}

/// Run `./configure` with an explicit argv. No shell sits in between,
/// so prefix paths containing whitespace arrive as single arguments.
pub(crate) fn configure<I, S>(dir: &Path, args: I, env: &BuildEnv) -> Result<(), CommandError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    ExternalCommand::new("./configure")
        .args(args)
        .current_dir(dir)
        .envs(env.vars())
        .run()
}

pub(crate) fn make(dir: &Path, env: &BuildEnv) -> ExternalCommand {
    ExternalCommand::new("make").current_dir(dir).envs(env.vars())
}

/// Copy the built daemon binary out of the source tree.
pub(crate) fn extract_binary(src: &Path, dest: &Path) -> Result<(), BuildError> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    std::fs::copy(src, dest).map_err(io_err(src))?;
    Ok(())
}

/// Strip everything non-deterministic or unneeded from an ELF binary.
pub(crate) fn strip_binary(path: &Path) -> Result<(), CommandError> {
    ExternalCommand::new("strip")
        .args([
            "-D",
            "--strip-unneeded",
            "--strip-debug",
            "-R",
            ".note*",
            "-R",
            ".comment",
        ])
        .arg(path.to_string_lossy())
        .run()
}

/// Pin a file's mtime to the release's canonical build time.
///
/// # Errors
///
/// Propagates the filesystem error.
pub fn normalize_mtime(path: &Path, timestamp: BuildTimestamp) -> std::io::Result<()> {
    let mtime = filetime::FileTime::from_unix_time(timestamp.unix_epoch(), 0);
    filetime::set_file_mtime(path, mtime)
}

/// Final per-arch packaging: normalize the binary's mtime, log its
/// sha256, and zip it as the single entry `tor`.
pub(crate) fn pack_binary(
    binary: &Path,
    zip_path: &Path,
    timestamp: BuildTimestamp,
) -> Result<(), BuildError> {
    normalize_mtime(binary, timestamp).map_err(io_err(binary))?;

    let digest = hashing::sha256_file(binary).map_err(io_err(binary))?;
    let name = zip_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    tracing::info!(zip = %name, %digest, "sha256 of tor before zipping");

    let mut zip = DeterministicZip::create(zip_path, timestamp)?;
    zip.append_file("tor", binary, 0o755)?;
    zip.finish()?;
    normalize_mtime(zip_path, timestamp).map_err(io_err(zip_path))?;
    Ok(())
}

//! Release artifact assembly.
//!
//! Turns a finished set of per-arch zips into the published deliverables:
//! the geo database zip, the binary bundle, the sources archive and the
//! POM. All archive bytes are deterministic (fixed entry times, stable
//! member order), so two builds of the same release package identically.

use std::path::{Path, PathBuf};

use thiserror::Error;
use trb_schema::{
    BuildTimestamp, Platform, ReleaseDescriptor, Sha256Digest, bundle_file_name, deps,
    pom_file_name, sources_file_name,
};

use crate::archive::{ArchiveError, DeterministicZip};
use crate::build::normalize_mtime;
use crate::hashing;

#[derive(Error, Debug)]
pub enum PackagingError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> PackagingError {
    let path = path.to_path_buf();
    move |source| PackagingError::Io { path, source }
}

/// Zip the geo IP database out of the daemon source tree into
/// `<out_dir>/geoip.zip`, returning the zip path.
///
/// # Errors
///
/// Fails if the database file is missing from the tree or any write
/// fails; errors name the offending path.
pub fn package_geoip(
    build_dir: &Path,
    out_dir: &Path,
    timestamp: BuildTimestamp,
) -> Result<PathBuf, PackagingError> {
    let source = build_dir.join(deps::TOR).join("src/config/geoip");
    std::fs::create_dir_all(out_dir).map_err(io_err(out_dir))?;

    let staged = out_dir.join("geoip");
    std::fs::copy(&source, &staged).map_err(io_err(&source))?;
    normalize_mtime(&staged, timestamp).map_err(io_err(&staged))?;

    let zip_path = out_dir.join("geoip.zip");
    let mut zip = DeterministicZip::create(&zip_path, timestamp)?;
    zip.append_file("geoip", &staged, 0o644)?;
    zip.finish()?;
    normalize_mtime(&zip_path, timestamp).map_err(io_err(&zip_path))?;
    Ok(zip_path)
}

/// Bundle the finished parts into `<out_root>/<bundle name>`, keeping
/// the caller's part order as the member order.
///
/// # Errors
///
/// Fails on a missing part or any write failure.
pub fn package_bundle(
    out_root: &Path,
    platform: Platform,
    descriptor: &ReleaseDescriptor,
    parts: &[PathBuf],
) -> Result<PathBuf, PackagingError> {
    let bundle = out_root.join(bundle_file_name(platform, descriptor.version));
    let mut zip = DeterministicZip::create(&bundle, descriptor.timestamp)?;
    for part in parts {
        normalize_mtime(part, descriptor.timestamp).map_err(io_err(part))?;
        let name = part
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        zip.append_file(&name, part, 0o644)?;
    }
    zip.finish()?;
    normalize_mtime(&bundle, descriptor.timestamp).map_err(io_err(&bundle))?;
    Ok(bundle)
}

/// Archive every pinned source tree under `build_dir` into the
/// platform's sources jar, sorted by relative path with VCS metadata
/// excluded. Run before building so the trees are pristine.
///
/// # Errors
///
/// Fails on any read or write failure.
pub fn create_sources_archive(
    build_dir: &Path,
    out_root: &Path,
    platform: Platform,
    descriptor: &ReleaseDescriptor,
) -> Result<PathBuf, PackagingError> {
    // a stale install prefix from an earlier run is not source
    let prefix = build_dir.join("prefix");
    if prefix.exists() {
        std::fs::remove_dir_all(&prefix).map_err(io_err(&prefix))?;
    }

    std::fs::create_dir_all(out_root).map_err(io_err(out_root))?;
    let path = out_root.join(sources_file_name(platform, descriptor.version));
    let mut zip = DeterministicZip::create(&path, descriptor.timestamp)?;
    zip.append_dir_sorted(build_dir)?;
    zip.finish()?;
    normalize_mtime(&path, descriptor.timestamp).map_err(io_err(&path))?;
    Ok(path)
}

/// Instantiate the platform's POM template, replacing every `VERSION`
/// token with the release version.
///
/// # Errors
///
/// Fails if the template cannot be read or the POM cannot be written.
pub fn create_pom(
    template: &Path,
    out_root: &Path,
    platform: Platform,
    descriptor: &ReleaseDescriptor,
) -> Result<PathBuf, PackagingError> {
    let contents = std::fs::read_to_string(template).map_err(io_err(template))?;
    let pom = contents.replace("VERSION", &descriptor.version.to_string());

    std::fs::create_dir_all(out_root).map_err(io_err(out_root))?;
    let path = out_root.join(pom_file_name(platform, descriptor.version));
    std::fs::write(&path, pom).map_err(io_err(&path))?;
    Ok(path)
}

/// Digest every artifact, in order, for the final hash report.
///
/// # Errors
///
/// Fails if any artifact cannot be read.
pub fn report_hashes(paths: &[PathBuf]) -> Result<Vec<(PathBuf, Sha256Digest)>, PackagingError> {
    let mut report = Vec::with_capacity(paths.len());
    for path in paths {
        let digest = hashing::sha256_file(path).map_err(io_err(path))?;
        report.push((path.clone(), digest));
    }
    Ok(report)
}

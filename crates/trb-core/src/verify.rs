//! Release verification.
//!
//! Downloads the published bundle for a release, rebuilds the same
//! bundle locally if it is not already on disk, and compares digests.
//! A mismatch is a result, not an error: the caller gets both hashes
//! and the verdict either way.

use std::path::{Path, PathBuf};

use reqwest::Client;
use thiserror::Error;
use trb_schema::{
    Platform, ReleaseDescriptor, Sha256Digest, TorVersion, artifact_id, bundle_file_name,
};

use crate::download::{self, DownloadError};
use crate::hashing;
use crate::pipeline::{self, PipelineError};

/// Maven Central, where releases are published today.
pub const CANONICAL_BASE: &str = "https://repo.maven.apache.org/maven2/org/briarproject";

/// The retired bintray mirror that still carries the oldest releases.
pub const LEGACY_BASE: &str =
    "https://dl.bintray.com/briarproject/org.briarproject/org/briarproject";

/// Where reference bundles are fetched from. Swappable for tests.
#[derive(Debug, Clone)]
pub struct Mirrors {
    pub canonical: String,
    pub legacy: String,
}

impl Default for Mirrors {
    fn default() -> Self {
        Self {
            canonical: CANONICAL_BASE.to_string(),
            legacy: LEGACY_BASE.to_string(),
        }
    }
}

/// Repository URL of a release bundle under `base`.
pub fn reference_url(base: &str, platform: Platform, version: TorVersion) -> String {
    format!(
        "{base}/{}/{version}/{}",
        artifact_id(platform),
        bundle_file_name(platform, version)
    )
}

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Cannot download reference bundle from {url}: {source}")]
    ReferenceDownload {
        url: String,
        #[source]
        source: DownloadError,
    },

    #[error(transparent)]
    Build(#[from] PipelineError),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> VerifyError {
    let path = path.to_path_buf();
    move |source| VerifyError::Io { path, source }
}

/// Both digests and the verdict for one platform.
#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub platform: Platform,
    pub version: TorVersion,
    pub reference: Sha256Digest,
    pub local: Sha256Digest,
    pub matched: bool,
}

impl VerifyOutcome {
    fn new(
        platform: Platform,
        version: TorVersion,
        reference: Sha256Digest,
        local: Sha256Digest,
    ) -> Self {
        let matched = reference == local;
        Self {
            platform,
            version,
            reference,
            local,
            matched,
        }
    }
}

/// Download the reference bundle into `dest`.
///
/// The canonical mirror is always tried first. Only releases old enough
/// to predate Maven Central publication may fall back to the legacy
/// mirror; for everything newer a canonical failure is final.
///
/// # Errors
///
/// Returns [`VerifyError::ReferenceDownload`] naming the last URL tried.
pub async fn fetch_reference(
    client: &Client,
    mirrors: &Mirrors,
    platform: Platform,
    version: TorVersion,
    dest: &Path,
) -> Result<(), VerifyError> {
    let url = reference_url(&mirrors.canonical, platform, version);
    match download::fetch(client, &url, dest).await {
        Ok(_) => Ok(()),
        Err(source) if version.allows_legacy_mirror() => {
            tracing::warn!(%url, error = %source, "canonical mirror failed, trying legacy mirror");
            let fallback = reference_url(&mirrors.legacy, platform, version);
            download::fetch(client, &fallback, dest)
                .await
                .map(|_| ())
                .map_err(|source| VerifyError::ReferenceDownload {
                    url: fallback,
                    source,
                })
        }
        Err(source) => Err(VerifyError::ReferenceDownload { url, source }),
    }
}

/// Verify one platform of a release: fetch the reference bundle into
/// `ref_dir`, build the local one under `out_root` if absent, digest
/// both.
///
/// # Errors
///
/// Returns [`VerifyError`] when the reference cannot be fetched or the
/// local build fails. Differing digests are reported through
/// [`VerifyOutcome::matched`], not as an error.
pub async fn verify_platform(
    client: &Client,
    mirrors: &Mirrors,
    descriptor: &ReleaseDescriptor,
    platform: Platform,
    ref_dir: &Path,
    out_root: &Path,
) -> Result<VerifyOutcome, VerifyError> {
    let bundle_name = bundle_file_name(platform, descriptor.version);

    std::fs::create_dir_all(ref_dir).map_err(io_err(ref_dir))?;
    let ref_path = ref_dir.join(&bundle_name);
    fetch_reference(client, mirrors, platform, descriptor.version, &ref_path).await?;

    let local_path = out_root.join(&bundle_name);
    if !local_path.is_file() {
        tracing::info!(bundle = %bundle_name, "no local bundle, building it now");
        pipeline::run_build(client, platform, descriptor).await?;
    }

    let reference = hashing::sha256_file(&ref_path).map_err(io_err(&ref_path))?;
    let local = hashing::sha256_file(&local_path).map_err(io_err(&local_path))?;
    Ok(VerifyOutcome::new(
        platform,
        descriptor.version,
        reference,
        local,
    ))
}

/// Verify every platform, best-effort: one platform failing does not
/// stop the others.
pub async fn verify_all(
    client: &Client,
    mirrors: &Mirrors,
    descriptor: &ReleaseDescriptor,
    ref_dir: &Path,
    out_root: &Path,
) -> Vec<(Platform, Result<VerifyOutcome, VerifyError>)> {
    let mut results = Vec::new();
    for platform in Platform::all() {
        let result =
            verify_platform(client, mirrors, descriptor, platform, ref_dir, out_root).await;
        results.push((platform, result));
    }
    results
}

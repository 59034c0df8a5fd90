//! Android NDK provisioning.
//!
//! The NDK is pinned like any other input: by URL, by the `Pkg.Revision`
//! its `source.properties` must report, and by the SHA256 of the
//! archive. A present NDK with the wrong revision is deleted and
//! replaced, never patched in place.

use std::path::{Path, PathBuf};

use reqwest::Client;
use thiserror::Error;
use trb_schema::NdkSpec;

use crate::download::{self, DownloadError};

#[derive(Error, Debug)]
pub enum NdkError {
    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot unpack NDK archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Unexpected NDK archive layout: expected a single android-ndk-r* root, found [{}]", found.join(", "))]
    Layout { found: Vec<String> },

    #[error("Cannot move NDK into place: {0}")]
    Move(#[from] fs_extra::error::Error),
}

/// `Pkg.Revision` of the NDK at `ndk_dir`, if one is installed.
pub fn installed_revision(ndk_dir: &Path) -> Option<String> {
    let properties = std::fs::read_to_string(ndk_dir.join("source.properties")).ok()?;
    pkg_revision(&properties)
}

fn pkg_revision(properties: &str) -> Option<String> {
    properties.lines().find_map(|line| {
        let (key, value) = line.split_once('=')?;
        (key.trim() == "Pkg.Revision").then(|| value.trim().to_string())
    })
}

/// The single `android-ndk-r*` directory the upstream zip unpacks to.
fn ndk_root(unpacked: &Path) -> Result<PathBuf, NdkError> {
    let mut roots = Vec::new();
    let mut found = Vec::new();
    for entry in std::fs::read_dir(unpacked)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.path().is_dir() && name.starts_with("android-ndk") {
            roots.push(entry.path());
        }
        found.push(name);
    }
    match roots.as_slice() {
        [root] => Ok(root.clone()),
        _ => Err(NdkError::Layout { found }),
    }
}

/// Make the pinned NDK available at `ndk_dir`, returning the absolute
/// path to export as `ANDROID_NDK_HOME`.
///
/// Skips all work when the installed `Pkg.Revision` already matches.
/// Otherwise any previous installation is removed, the archive is
/// downloaded with its digest enforced, unpacked into a staging
/// directory next to `ndk_dir`, and the unpacked root moved into place.
///
/// # Errors
///
/// Returns [`NdkError::Download`] for network and checksum failures and
/// [`NdkError::Layout`] if the archive does not contain exactly one
/// `android-ndk-r*` root.
pub async fn ensure_ndk(
    client: &Client,
    ndk_dir: &Path,
    spec: &NdkSpec,
) -> Result<PathBuf, NdkError> {
    if let Some(found) = installed_revision(ndk_dir) {
        if found == spec.revision {
            tracing::info!(revision = %spec.revision, "NDK already in place");
            return Ok(std::fs::canonicalize(ndk_dir)?);
        }
        tracing::info!(%found, want = %spec.revision, "replacing NDK");
        std::fs::remove_dir_all(ndk_dir)?;
    } else if ndk_dir.exists() {
        // present but without a readable revision, so unusable
        std::fs::remove_dir_all(ndk_dir)?;
    }

    let parent = ndk_dir.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    // staged next to the destination so the final rename stays on one
    // filesystem
    let stage = tempfile::Builder::new()
        .prefix(".ndk-stage")
        .tempdir_in(parent)?;

    let archive_path = stage.path().join(crate::paths::filename_from_url(&spec.url));
    download::fetch_verified(client, &spec.url, &archive_path, &spec.sha256).await?;

    let unpacked = stage.path().join("unpacked");
    let file = std::fs::File::open(&archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    archive.extract(&unpacked)?;

    let root = ndk_root(&unpacked)?;
    if std::fs::rename(&root, ndk_dir).is_err() {
        let options = fs_extra::dir::CopyOptions::new().copy_inside(true);
        fs_extra::dir::move_dir(&root, ndk_dir, &options)?;
    }
    Ok(std::fs::canonicalize(ndk_dir)?)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use sha2::Digest;
    use trb_schema::Sha256Digest;

    use super::*;

    fn spec(url: &str, revision: &str, sha256: &str) -> NdkSpec {
        NdkSpec {
            url: url.to_string(),
            revision: revision.to_string(),
            sha256: Sha256Digest::new(sha256).unwrap(),
        }
    }

    /// In-memory NDK zip with the canonical single-root layout.
    fn ndk_zip(revision: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        writer
            .start_file("android-ndk-r25c/source.properties", options)
            .unwrap();
        writer
            .write_all(format!("Pkg.Desc = Android NDK\nPkg.Revision = {revision}\n").as_bytes())
            .unwrap();
        writer
            .start_file("android-ndk-r25c/ndk-build", options)
            .unwrap();
        writer.write_all(b"#!/bin/sh\n").unwrap();
        writer.finish().unwrap().into_inner()
    }

    fn digest_of(bytes: &[u8]) -> String {
        hex::encode(sha2::Sha256::digest(bytes))
    }

    #[test]
    fn pkg_revision_reads_the_properties_line() {
        let properties = "Pkg.Desc = Android NDK\nPkg.Revision = 25.2.9519653\n";
        assert_eq!(pkg_revision(properties).as_deref(), Some("25.2.9519653"));
        assert_eq!(pkg_revision("Pkg.Desc = Android NDK\n"), None);
    }

    #[tokio::test]
    async fn matching_revision_short_circuits() {
        let tmp = tempfile::tempdir().unwrap();
        let ndk_dir = tmp.path().join("android-ndk");
        std::fs::create_dir_all(&ndk_dir).unwrap();
        std::fs::write(
            ndk_dir.join("source.properties"),
            "Pkg.Revision = 25.2.9519653\n",
        )
        .unwrap();

        // the URL is unroutable, so any download attempt would fail
        let spec = spec(
            "http://127.0.0.1:1/ndk.zip",
            "25.2.9519653",
            &digest_of(b""),
        );
        ensure_ndk(&Client::new(), &ndk_dir, &spec).await.unwrap();
    }

    #[tokio::test]
    async fn stale_revision_is_replaced() {
        let tmp = tempfile::tempdir().unwrap();
        let ndk_dir = tmp.path().join("android-ndk");
        std::fs::create_dir_all(&ndk_dir).unwrap();
        std::fs::write(
            ndk_dir.join("source.properties"),
            "Pkg.Revision = 23.1.7779620\n",
        )
        .unwrap();
        std::fs::write(ndk_dir.join("leftover"), "old").unwrap();

        let zip_bytes = ndk_zip("25.2.9519653");
        let digest = digest_of(&zip_bytes);
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ndk.zip")
            .with_body(zip_bytes)
            .create_async()
            .await;

        let url = format!("{}/ndk.zip", server.url());
        let spec = spec(&url, "25.2.9519653", &digest);
        let home = ensure_ndk(&Client::new(), &ndk_dir, &spec).await.unwrap();

        mock.assert_async().await;
        assert!(home.is_absolute());
        assert_eq!(installed_revision(&ndk_dir).as_deref(), Some("25.2.9519653"));
        assert!(ndk_dir.join("ndk-build").exists());
        assert!(!ndk_dir.join("leftover").exists());
    }

    #[tokio::test]
    async fn wrong_digest_fails_before_unpacking() {
        let tmp = tempfile::tempdir().unwrap();
        let ndk_dir = tmp.path().join("android-ndk");

        let zip_bytes = ndk_zip("25.2.9519653");
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/ndk.zip")
            .with_body(zip_bytes)
            .create_async()
            .await;

        let url = format!("{}/ndk.zip", server.url());
        let spec = spec(&url, "25.2.9519653", &digest_of(b"something else"));
        let err = ensure_ndk(&Client::new(), &ndk_dir, &spec)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NdkError::Download(DownloadError::ChecksumMismatch { .. })
        ));
        assert!(!ndk_dir.exists());
    }

    #[tokio::test]
    async fn multi_root_archive_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let ndk_dir = tmp.path().join("android-ndk");

        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        for root in ["android-ndk-r25c", "android-ndk-r26b"] {
            writer
                .start_file(format!("{root}/source.properties"), options)
                .unwrap();
            writer.write_all(b"Pkg.Revision = x\n").unwrap();
        }
        let zip_bytes = writer.finish().unwrap().into_inner();
        let digest = digest_of(&zip_bytes);

        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/ndk.zip")
            .with_body(zip_bytes)
            .create_async()
            .await;

        let url = format!("{}/ndk.zip", server.url());
        let spec = spec(&url, "25.2.9519653", &digest);
        let err = ensure_ndk(&Client::new(), &ndk_dir, &spec)
            .await
            .unwrap_err();
        assert!(matches!(err, NdkError::Layout { .. }));
    }
}

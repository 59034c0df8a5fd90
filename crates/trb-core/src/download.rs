//! File downloads with streaming SHA256 verification.

use std::path::Path;

use futures::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use trb_schema::Sha256Digest;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checksum mismatch for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        url: String,
        expected: Sha256Digest,
        actual: Sha256Digest,
    },
}

/// Download `url` to `dest`, hashing the bytes as they stream in.
///
/// # Errors
///
/// Returns [`DownloadError::Http`] for connection failures and non-2xx
/// responses, [`DownloadError::Io`] if `dest` cannot be written.
pub async fn fetch(client: &Client, url: &str, dest: &Path) -> Result<Sha256Digest, DownloadError> {
    tracing::debug!(url, dest = %dest.display(), "downloading");

    let response = client
        .get(url)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
        .send()
        .await?
        .error_for_status()?;

    let mut file = File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut hasher = Sha256::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        hasher.update(&chunk);
    }

    file.flush().await?;
    Ok(Sha256Digest::from_bytes(&hasher.finalize()))
}

/// Download `url` to `dest` and require the payload to match `expected`.
/// The file is removed again on a mismatch.
///
/// # Errors
///
/// Everything [`fetch`] returns, plus
/// [`DownloadError::ChecksumMismatch`].
pub async fn fetch_verified(
    client: &Client,
    url: &str,
    dest: &Path,
    expected: &Sha256Digest,
) -> Result<(), DownloadError> {
    let actual = fetch(client, url, dest).await?;
    if actual != *expected {
        tokio::fs::remove_file(dest).await.ok();
        return Err(DownloadError::ChecksumMismatch {
            url: url.to_string(),
            expected: expected.clone(),
            actual,
        });
    }
    Ok(())
}

//! Source acquisition.
//!
//! Brings every pinned dependency tree to an exact, clean state. The
//! step order matters: submodules are initialized only after the forced
//! checkout because a pinned submodule commit may be unreachable from
//! the default branch tip, and the final clean pass removes ignored
//! files too, since a stray build artifact would change the sources
//! archive's bytes.
//!
//! Any git failure aborts the run; a half-updated tree must never feed
//! a build.

use std::path::Path;

use reqwest::Client;
use thiserror::Error;
use trb_schema::ReleaseDescriptor;

use crate::download::{self, DownloadError};
use crate::process::{CommandError, ExternalCommand};

/// Where daemon patches are published, one `<commit>.patch` per pinned id.
pub const TOR_PATCH_BASE: &str = "https://github.com/guardianproject/tor/commit";

#[derive(Error, Debug)]
pub enum SourceError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot fetch patch {commit}: {source}")]
    PatchDownload {
        commit: String,
        #[source]
        source: DownloadError,
    },
}

fn git(dir: &Path) -> ExternalCommand {
    ExternalCommand::new("git").current_dir(dir)
}

/// Bring every dependency tree under `root` to its pinned, clean state.
///
/// Idempotent: each call clones or fetches as needed, force-checks-out
/// the pinned revision, pins submodules, hard-resets, and clears
/// untracked and ignored files recursively. Calling it twice leaves the
/// trees exactly as one call does.
///
/// # Errors
///
/// Returns [`SourceError::Command`] on the first failing git
/// invocation; no later tree is touched after a failure.
pub fn ensure_clean(root: &Path, descriptor: &ReleaseDescriptor) -> Result<(), SourceError> {
    std::fs::create_dir_all(root)?;

    for (name, pin) in &descriptor.dependencies {
        tracing::info!(dependency = %name, revision = %pin.revision, "pinning source tree");
        let dir = root.join(name);

        if dir.is_dir() {
            git(&dir)
                .args(["fetch", "--recurse-submodules=yes", "origin"])
                .run()?;
        } else {
            ExternalCommand::new("git")
                .args(["clone", pin.url.as_str(), name.as_str()])
                .current_dir(root)
                .run()?;
        }

        git(&dir)
            .args(["checkout", "-f", pin.revision.as_str()])
            .run()?;

        // after checkout: submodule pins may reference commits
        // unreachable from the branch tips fetch saw
        git(&dir)
            .args(["submodule", "update", "--init", "--recursive"])
            .run()?;

        git(&dir).args(["reset", "--hard"]).run()?;
        git(&dir)
            .args(["submodule", "foreach", "--recursive", "git", "reset", "--hard"])
            .run()?;

        git(&dir).args(["clean", "-dffx"]).run()?;
        git(&dir)
            .args(["submodule", "foreach", "--recursive", "git", "clean", "-dffx"])
            .run()?;
    }

    Ok(())
}

/// Fetch and apply each pinned patch commit to the daemon tree at
/// `tor_dir`. The tree is expected to be freshly cleaned, so plain
/// `git apply` suffices and reapplication cannot conflict.
///
/// # Errors
///
/// Returns [`SourceError::PatchDownload`] if a patch cannot be fetched
/// and [`SourceError::Command`] if `git apply` rejects one.
pub async fn apply_patches(
    client: &Client,
    patch_base: &str,
    tor_dir: &Path,
    commits: &[String],
) -> Result<(), SourceError> {
    for commit in commits {
        tracing::info!(%commit, "applying daemon patch");
        let patch_name = format!("{commit}.patch");
        let url = format!("{patch_base}/{patch_name}");
        let dest = tor_dir.join(&patch_name);

        download::fetch(client, &url, &dest)
            .await
            .map_err(|source| SourceError::PatchDownload {
                commit: commit.clone(),
                source,
            })?;

        git(tor_dir).args(["apply", patch_name.as_str()]).run()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use trb_schema::ReleaseDescriptor;

    fn git_missing() -> bool {
        which::which("git").is_err()
    }

    fn run_git(dir: &Path, args: &[&str]) {
        ExternalCommand::new("git")
            .args(args.iter().copied())
            .current_dir(dir)
            .run()
            .unwrap();
    }

    /// Create a one-file upstream repo tagged `v1`.
    fn init_upstream(dir: &Path) {
        std::fs::create_dir_all(dir).unwrap();
        run_git(dir, &["init", "-q", "."]);
        std::fs::write(dir.join("hello.txt"), "original\n").unwrap();
        run_git(dir, &["add", "."]);
        run_git(
            dir,
            &[
                "-c",
                "user.email=trb@test",
                "-c",
                "user.name=trb",
                "commit",
                "-q",
                "-m",
                "initial",
            ],
        );
        run_git(dir, &["tag", "v1"]);
    }

    fn descriptor_for(upstream: &Path) -> ReleaseDescriptor {
        serde_json::from_str(&format!(
            r#"{{
                "version": "0.4.8.21",
                "timestamp": "201001010000.00",
                "dependencies": {{
                    "tor": {{ "url": "{}", "revision": "v1" }}
                }},
                "ndk": {{
                    "url": "https://example.org/ndk.zip",
                    "revision": "25.2.9519653",
                    "sha256": "769ee342ea75f80619d985c2da990c48b3d8eaf45f48783a2d48870d04b46108"
                }}
            }}"#,
            upstream.display()
        ))
        .unwrap()
    }

    #[test]
    fn ensure_clean_materializes_pinned_trees() {
        if git_missing() {
            eprintln!("git not found, skipping");
            return;
        }
        let tmp = tempfile::tempdir().unwrap();
        let upstream = tmp.path().join("upstream");
        init_upstream(&upstream);

        let root = tmp.path().join("build");
        let descriptor = descriptor_for(&upstream);

        ensure_clean(&root, &descriptor).unwrap();
        assert_eq!(
            std::fs::read_to_string(root.join("tor/hello.txt")).unwrap(),
            "original\n"
        );
    }

    #[test]
    fn ensure_clean_reverts_drift() {
        if git_missing() {
            eprintln!("git not found, skipping");
            return;
        }
        let tmp = tempfile::tempdir().unwrap();
        let upstream = tmp.path().join("upstream");
        init_upstream(&upstream);

        let root = tmp.path().join("build");
        let descriptor = descriptor_for(&upstream);
        ensure_clean(&root, &descriptor).unwrap();

        // dirty the tree: modify a tracked file, add untracked junk
        let tree = root.join("tor");
        std::fs::write(tree.join("hello.txt"), "tampered\n").unwrap();
        std::fs::write(tree.join("stray.o"), "junk").unwrap();
        std::fs::create_dir_all(tree.join("objs")).unwrap();
        std::fs::write(tree.join("objs/a.o"), "junk").unwrap();

        ensure_clean(&root, &descriptor).unwrap();

        assert_eq!(
            std::fs::read_to_string(tree.join("hello.txt")).unwrap(),
            "original\n"
        );
        assert!(!tree.join("stray.o").exists());
        assert!(!tree.join("objs").exists());
    }

    #[test]
    fn unknown_revision_is_fatal() {
        if git_missing() {
            eprintln!("git not found, skipping");
            return;
        }
        let tmp = tempfile::tempdir().unwrap();
        let upstream = tmp.path().join("upstream");
        init_upstream(&upstream);

        let root = tmp.path().join("build");
        let mut descriptor = descriptor_for(&upstream);
        if let Some(pin) = descriptor.dependencies.get_mut("tor") {
            pin.revision = "v9".to_string();
        }

        let err = ensure_clean(&root, &descriptor).unwrap_err();
        assert!(matches!(err, SourceError::Command(_)));
    }

    #[tokio::test]
    async fn patches_download_and_apply() {
        if git_missing() {
            eprintln!("git not found, skipping");
            return;
        }
        let tmp = tempfile::tempdir().unwrap();
        let tree = tmp.path().join("tor");
        init_upstream(&tree);

        let patch = "diff --git a/hello.txt b/hello.txt\n\
                     --- a/hello.txt\n\
                     +++ b/hello.txt\n\
                     @@ -1 +1 @@\n\
                     -original\n\
                     +patched\n";
        let commit = "6522c8a2ae9b2f9c4c488188f88d38728ee487a7";
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", format!("/{commit}.patch").as_str())
            .with_body(patch)
            .create_async()
            .await;

        let client = Client::new();
        apply_patches(&client, &server.url(), &tree, &[commit.to_string()])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            std::fs::read_to_string(tree.join("hello.txt")).unwrap(),
            "patched\n"
        );
    }

    #[tokio::test]
    async fn missing_patch_is_a_download_error() {
        let tmp = tempfile::tempdir().unwrap();
        let tree = tmp.path().join("tor");
        std::fs::create_dir_all(&tree).unwrap();

        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/deadbeef.patch")
            .with_status(404)
            .create_async()
            .await;

        let client = Client::new();
        let err = apply_patches(&client, &server.url(), &tree, &["deadbeef".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::PatchDownload { .. }));
    }
}

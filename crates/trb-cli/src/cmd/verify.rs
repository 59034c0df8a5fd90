//! Verify command

use anyhow::{Context, Result};
use trb_core::registry::Registry;
use trb_core::verify::{self, Mirrors, VerifyError, VerifyOutcome};
use trb_core::paths;
use trb_schema::Platform;

use crate::ui;

/// Rebuild a release and compare it against the published bundles.
///
/// Every platform is checked unless one is named. A hash mismatch does
/// not abort the remaining platforms, but any mismatch or failure makes
/// the command exit non-zero.
pub async fn verify(version: Option<&str>, platform: Option<&str>) -> Result<()> {
    let registry =
        Registry::load(&paths::registry_path()).context("Failed to load the release registry")?;
    let descriptor = registry.resolve(version)?;

    let mirrors = Mirrors::default();
    let client = reqwest::Client::new();
    let ref_dir = paths::reference_dir();
    let out_root = paths::output_root();

    tracing::info!(version = %descriptor.version, "verifying release");

    let outcomes: Vec<(Platform, Result<VerifyOutcome, VerifyError>)> = match platform {
        Some(name) => {
            let platform: Platform = name.parse().map_err(anyhow::Error::msg)?;
            let outcome = verify::verify_platform(
                &client, &mirrors, descriptor, platform, &ref_dir, &out_root,
            )
            .await;
            vec![(platform, outcome)]
        }
        None => verify::verify_all(&client, &mirrors, descriptor, &ref_dir, &out_root).await,
    };

    let mut failures = 0usize;
    for (platform, outcome) in outcomes {
        match outcome {
            Ok(outcome) => {
                ui::info(&format!("Reference sha256: {}", outcome.reference));
                ui::info(&format!("Build sha256:     {}", outcome.local));
                if outcome.matched {
                    ui::success(&format!(
                        "Tor for {} version {} was successfully verified! \\o/",
                        platform.label(),
                        outcome.version
                    ));
                } else {
                    ui::error(&format!(
                        "Hashes for Tor for {} version {} do not match! :(",
                        platform.label(),
                        outcome.version
                    ));
                    failures += 1;
                }
            }
            Err(err) => {
                ui::error(&format!(
                    "Verification of Tor for {} failed: {err}",
                    platform.label()
                ));
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("verification failed for {failures} platform(s)");
    }
    Ok(())
}

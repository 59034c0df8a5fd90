//! Build command

use anyhow::{Context, Result};
use trb_core::registry::Registry;
use trb_core::{packaging, paths, pipeline};
use trb_schema::Platform;

use crate::ui;

/// Build release bundles for `platform` (or `all`) at the requested
/// version.
pub async fn build(platform: &str, version: Option<&str>) -> Result<()> {
    let registry =
        Registry::load(&paths::registry_path()).context("Failed to load the release registry")?;
    let descriptor = registry.resolve(version)?;

    let platforms: Vec<Platform> = if platform == "all" {
        Platform::all().to_vec()
    } else {
        vec![platform.parse().map_err(anyhow::Error::msg)?]
    };

    let client = reqwest::Client::new();
    for platform in platforms {
        tracing::info!(%platform, version = %descriptor.version, "starting platform build");
        ui::info(&format!(
            "Building Tor {} for {}",
            descriptor.version,
            platform.label()
        ));

        let report = pipeline::run_build(&client, platform, descriptor).await?;
        let hashes = packaging::report_hashes(&report.artifacts)?;

        ui::success(&format!(
            "Tor for {} version {} built",
            platform.label(),
            descriptor.version
        ));
        for (path, digest) in &hashes {
            ui::hash(path, digest);
        }
    }

    Ok(())
}

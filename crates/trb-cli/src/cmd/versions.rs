//! Versions command

use anyhow::{Context, Result};
use trb_core::paths;
use trb_core::registry::Registry;

use crate::ui;

/// List every release the registry knows about, newest first.
pub fn versions() -> Result<()> {
    let registry =
        Registry::load(&paths::registry_path()).context("Failed to load the release registry")?;
    tracing::info!(releases = registry.entries().len(), "release registry loaded");

    for (index, entry) in registry.entries().iter().enumerate() {
        ui::version_row(&entry.version.to_string(), index == 0);
    }

    Ok(())
}

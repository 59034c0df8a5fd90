//! The end-to-end build pipeline for one platform.
//!
//! Order matters: the sources archive is cut from the pristine trees
//! before any compiler runs, the geo database is packaged from the
//! clean daemon tree, and only then do the drivers start dirtying
//! things. Platforms and arches run strictly sequentially because they
//! all share `build/` and its install prefix.

use std::path::PathBuf;

use reqwest::Client;
use thiserror::Error;
use trb_schema::{Platform, ReleaseDescriptor};

use crate::build::{self, BuildError};
use crate::packaging::{self, PackagingError};
use crate::process::{CommandError, require_tools};
use crate::sources::SourceError;
use crate::{paths, sources};

/// Everything one platform build produced, in hash-report order:
/// per-arch zips, `geoip.zip`, the bundle, the sources jar, the POM.
#[derive(Debug)]
pub struct BuildReport {
    pub platform: Platform,
    pub artifacts: Vec<PathBuf>,
    pub bundle: PathBuf,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Packaging(#[from] PackagingError),
}

/// Which external tools a platform build shells out to.
fn preflight(platform: Platform) -> Result<(), CommandError> {
    let mut tools = vec!["git", "make", "sh"];
    match platform {
        Platform::Linux => {
            tools.extend(["perl", "strip"]);
            tools.extend(build::linux::ARCHES.iter().map(|arch| arch.cc));
        }
        Platform::Windows => {
            tools.extend(["perl", "strip", build::windows::CC]);
        }
        // the NDK brings its own toolchain
        Platform::Android => {}
    }
    require_tools(&tools)
}

/// Build one platform end to end and return the produced artifacts.
///
/// # Errors
///
/// Returns the first [`PipelineError`]; artifacts finished before the
/// failure stay on disk.
pub async fn run_build(
    client: &Client,
    platform: Platform,
    descriptor: &ReleaseDescriptor,
) -> Result<BuildReport, PipelineError> {
    preflight(platform)?;
    tracing::info!(%platform, version = %descriptor.version, "building Tor");

    let build_dir = paths::build_dir();
    sources::ensure_clean(&build_dir, descriptor)?;

    let out_root = paths::output_root();
    let sources_jar =
        packaging::create_sources_archive(&build_dir, &out_root, platform, descriptor)?;

    let out_dir = paths::platform_output_dir(platform);
    let geoip = packaging::package_geoip(&build_dir, &out_dir, descriptor.timestamp)?;

    let mut parts = match platform {
        Platform::Linux => build::linux::build(descriptor)?,
        Platform::Windows => build::windows::build(descriptor)?,
        Platform::Android => build::android::build(client, descriptor).await?,
    };
    parts.push(geoip);

    let bundle = packaging::package_bundle(&out_root, platform, descriptor, &parts)?;
    let pom = packaging::create_pom(
        &paths::template_path(platform),
        &out_root,
        platform,
        descriptor,
    )?;

    let mut artifacts = parts;
    artifacts.push(bundle.clone());
    artifacts.push(sources_jar);
    artifacts.push(pom);

    Ok(BuildReport {
        platform,
        artifacts,
        bundle,
    })
}

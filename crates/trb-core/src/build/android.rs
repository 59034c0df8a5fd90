//! Android builds through the tor-android make harness.
//!
//! The harness's `external/` directory carries its own pinned submodule
//! trees and drives the NDK toolchain, so this driver does not run
//! configure itself: it readies the NDK, patches the daemon tree, and
//! invokes `make clean tor` once per ABI.

use std::path::{Path, PathBuf};

use reqwest::Client;
use trb_schema::{Platform, ReleaseDescriptor, deps};

use crate::env::BuildEnv;
use crate::{ndk, paths, sources};

use super::{BuildError, extract_binary, io_err, make, pack_binary};

pub(crate) struct Abi {
    pub zip_name: &'static str,
    pub abi: &'static str,
    pub platform_level: &'static str,
}

pub(crate) const ABIS: [Abi; 4] = [
    Abi {
        zip_name: "tor_arm_pie.zip",
        abi: "armeabi-v7a",
        // first level supporting PIE
        platform_level: "16",
    },
    Abi {
        zip_name: "tor_arm64_pie.zip",
        abi: "arm64-v8a",
        // first level supporting 64-bit
        platform_level: "21",
    },
    Abi {
        zip_name: "tor_x86_pie.zip",
        abi: "x86",
        platform_level: "16",
    },
    Abi {
        zip_name: "tor_x86_64_pie.zip",
        abi: "x86_64",
        platform_level: "21",
    },
];

/// Build every Android ABI in order, returning the per-ABI zips.
///
/// # Errors
///
/// Returns the first [`BuildError`]; zips already produced stay on disk.
pub async fn build(
    client: &Client,
    descriptor: &ReleaseDescriptor,
) -> Result<Vec<PathBuf>, BuildError> {
    let ndk_home = ndk::ensure_ndk(client, &paths::ndk_dir(), &descriptor.ndk).await?;

    let build_dir = paths::build_dir();
    sources::ensure_clean(&build_dir, descriptor)?;

    // the harness compiles its own submodule tree, so that is the one
    // to patch
    let harness = build_dir.join(deps::TOR_ANDROID).join("external");
    sources::apply_patches(
        client,
        sources::TOR_PATCH_BASE,
        &harness.join("tor"),
        &descriptor.android_patches,
    )
    .await?;

    let out_dir = paths::platform_output_dir(Platform::Android);
    std::fs::create_dir_all(&out_dir).map_err(io_err(&out_dir))?;

    let base = BuildEnv::for_release(descriptor)
        .with("ANDROID_NDK_HOME", ndk_home.display().to_string());

    let mut zips = Vec::new();
    for abi in &ABIS {
        zips.push(build_abi(abi, &harness, &base, descriptor, &out_dir)?);
    }
    Ok(zips)
}

fn build_abi(
    abi: &Abi,
    harness: &Path,
    base: &BuildEnv,
    descriptor: &ReleaseDescriptor,
    out_dir: &Path,
) -> Result<PathBuf, BuildError> {
    tracing::info!(zip = abi.zip_name, "building");

    let env = base
        .clone()
        .with("APP_ABI", abi.abi)
        .with("NDK_PLATFORM_LEVEL", abi.platform_level);
    make(harness, &env).args(["clean", "tor"]).run()?;

    let binary = out_dir.join("tor");
    // stripping happens in the harness makefile
    extract_binary(&harness.join("tor/src/app/tor"), &binary)?;

    let zip_path = out_dir.join(abi.zip_name);
    pack_binary(&binary, &zip_path, descriptor.timestamp)?;
    Ok(zip_path)
}

//! Workspace directory layout.
//!
//! Everything lives under a single root (`$TRB_HOME`, default the
//! current directory): cloned sources in `build/`, finished artifacts in
//! `out/`, reference downloads in `reference/`, the NDK in
//! `android-ndk/`.

use std::path::PathBuf;

use trb_schema::Platform;

/// Returns the pipeline root directory (`$TRB_HOME`, default `.`).
pub fn trb_home() -> PathBuf {
    std::env::var("TRB_HOME").map_or_else(|_| PathBuf::from("."), PathBuf::from)
}

/// Cloned dependency source trees: `<home>/build`
pub fn build_dir() -> PathBuf {
    trb_home().join("build")
}

/// Final artifacts (bundles, sources jars, POMs): `<home>/out`
pub fn output_root() -> PathBuf {
    trb_home().join("out")
}

/// Per-platform intermediate zips: `<home>/out/<platform>`
pub fn platform_output_dir(platform: Platform) -> PathBuf {
    output_root().join(platform.as_str())
}

/// Downloaded reference artifacts for verification: `<home>/reference`
pub fn reference_dir() -> PathBuf {
    trb_home().join("reference")
}

/// Unpacked Android NDK: `<home>/android-ndk`
pub fn ndk_dir() -> PathBuf {
    trb_home().join("android-ndk")
}

/// Release registry path (`$TRB_REGISTRY` override, else
/// `<home>/tor-versions.json`).
pub fn registry_path() -> PathBuf {
    std::env::var("TRB_REGISTRY")
        .map_or_else(|_| trb_home().join("tor-versions.json"), PathBuf::from)
}

/// POM template for a platform: `<home>/templates/<platform>.pom`
pub fn template_path(platform: Platform) -> PathBuf {
    trb_home()
        .join("templates")
        .join(format!("{platform}.pom"))
}

/// Extract the filename from a URL.
pub fn filename_from_url(url: &str) -> &str {
    url.split('/').next_back().unwrap_or("")
}

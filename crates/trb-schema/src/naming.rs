//! Release artifact naming.
//!
//! One scheme for every deliverable: `tor-{platform}-{version}` plus a
//! role-specific suffix. The binary bundle switched from bare `.zip` to
//! `.jar` at 0.3.5.14; everything else has always been a jar or pom.

use crate::platform::Platform;
use crate::version::TorVersion;

/// Repository artifact id for a platform, e.g. `tor-android`.
pub fn artifact_id(platform: Platform) -> String {
    format!("tor-{platform}")
}

/// File name of the binary bundle, e.g. `tor-linux-0.4.8.21.jar`.
pub fn bundle_file_name(platform: Platform, version: TorVersion) -> String {
    let ext = if version.uses_legacy_bundle_extension() {
        "zip"
    } else {
        "jar"
    };
    format!("tor-{platform}-{version}.{ext}")
}

/// File name of the sources archive, e.g. `tor-linux-0.4.8.21-sources.jar`.
pub fn sources_file_name(platform: Platform, version: TorVersion) -> String {
    format!("tor-{platform}-{version}-sources.jar")
}

/// File name of the POM, e.g. `tor-linux-0.4.8.21.pom`.
pub fn pom_file_name(platform: Platform, version: TorVersion) -> String {
    format!("tor-{platform}-{version}.pom")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> TorVersion {
        s.parse().unwrap()
    }

    #[test]
    fn names_are_deterministic() {
        let a = bundle_file_name(Platform::Android, v("0.4.8.21"));
        let b = bundle_file_name(Platform::Android, v("0.4.8.21"));
        assert_eq!(a, b);
        assert_eq!(a, "tor-android-0.4.8.21.jar");
    }

    #[test]
    fn legacy_releases_get_zip_bundles() {
        assert_eq!(
            bundle_file_name(Platform::Android, v("0.3.5.13")),
            "tor-android-0.3.5.13.zip"
        );
        // the cutoff itself is modern
        assert_eq!(
            bundle_file_name(Platform::Android, v("0.3.5.14")),
            "tor-android-0.3.5.14.jar"
        );
    }

    #[test]
    fn companion_artifacts() {
        assert_eq!(
            sources_file_name(Platform::Windows, v("0.4.7.13")),
            "tor-windows-0.4.7.13-sources.jar"
        );
        assert_eq!(
            pom_file_name(Platform::Linux, v("0.4.7.13")),
            "tor-linux-0.4.7.13.pom"
        );
        assert_eq!(artifact_id(Platform::Windows), "tor-windows");
    }
}

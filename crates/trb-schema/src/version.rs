//! Four-part Tor version numbers and the legacy behavior cutoffs.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A four-part Tor release version, e.g. `0.4.7.13`.
///
/// Components are stored numerically so that ordering is numeric per
/// component. String comparison would put `0.4.10.x` before `0.4.9.x`;
/// this type does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TorVersion([u32; 4]);

/// Last release family that shipped the Android bundle as a bare `.zip`.
/// Versions strictly below this use the `.zip` extension, everything at
/// or after it is a `.jar`.
pub const LEGACY_BUNDLE_CUTOFF: TorVersion = TorVersion::new([0, 3, 5, 14]);

/// First release published only to the canonical repository. Reference
/// downloads for versions strictly below this may fall back to the
/// legacy mirror once; at or after it the canonical URL is the only
/// source.
pub const LEGACY_MIRROR_CUTOFF: TorVersion = TorVersion::new([0, 4, 5, 7]);

/// Errors raised when parsing a version string.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum VersionError {
    /// The string did not have exactly four dot-separated components.
    #[error("Invalid version '{0}': expected four dot-separated components")]
    ComponentCount(String),

    /// A component was not a decimal number.
    #[error("Invalid version '{0}': component '{1}' is not a number")]
    NotANumber(String, String),
}

impl TorVersion {
    /// Create a version from its four numeric components.
    pub const fn new(parts: [u32; 4]) -> Self {
        Self(parts)
    }

    /// The four numeric components, most significant first.
    pub fn parts(self) -> [u32; 4] {
        self.0
    }

    /// Whether bundles for this release use the legacy bare `.zip`
    /// extension instead of `.jar`.
    pub fn uses_legacy_bundle_extension(self) -> bool {
        self < LEGACY_BUNDLE_CUTOFF
    }

    /// Whether reference downloads for this release may consult the
    /// legacy mirror after the canonical repository fails.
    pub fn allows_legacy_mirror(self) -> bool {
        self < LEGACY_MIRROR_CUTOFF
    }
}

impl std::fmt::Display for TorVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{a}.{b}.{c}.{d}")
    }
}

impl std::str::FromStr for TorVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split('.').collect();
        let [a, b, c, d] = fields[..] else {
            return Err(VersionError::ComponentCount(s.to_string()));
        };
        let mut parts = [0u32; 4];
        for (slot, field) in parts.iter_mut().zip([a, b, c, d]) {
            *slot = field
                .parse()
                .map_err(|_| VersionError::NotANumber(s.to_string(), field.to_string()))?;
        }
        Ok(Self(parts))
    }
}

impl Serialize for TorVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TorVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> TorVersion {
        s.parse().unwrap()
    }

    #[test]
    fn ordering_is_numeric_per_component() {
        assert!(v("0.4.10.1") > v("0.4.9.9"));
        assert!(v("0.4.10.1") > v("0.3.5.14"));
        assert!(v("0.4.7.13") < v("0.4.7.14"));
        assert!(v("1.0.0.0") > v("0.9.9.9"));
    }

    #[test]
    fn display_round_trips() {
        assert_eq!(v("0.4.8.21").to_string(), "0.4.8.21");
    }

    #[test]
    fn parse_rejects_bad_shapes() {
        assert_eq!(
            "0.4.7".parse::<TorVersion>(),
            Err(VersionError::ComponentCount("0.4.7".to_string()))
        );
        assert!("0.4.7.13.1".parse::<TorVersion>().is_err());
        assert_eq!(
            "0.4.x.13".parse::<TorVersion>(),
            Err(VersionError::NotANumber(
                "0.4.x.13".to_string(),
                "x".to_string()
            ))
        );
    }

    #[test]
    fn legacy_bundle_boundary_is_exclusive() {
        assert!(v("0.3.5.13").uses_legacy_bundle_extension());
        assert!(!v("0.3.5.14").uses_legacy_bundle_extension());
        assert!(!v("0.4.7.13").uses_legacy_bundle_extension());
    }

    #[test]
    fn legacy_mirror_boundary_is_exclusive() {
        assert!(v("0.4.5.6").allows_legacy_mirror());
        assert!(!v("0.4.5.7").allows_legacy_mirror());
        assert!(!v("0.4.8.21").allows_legacy_mirror());
    }

    #[test]
    fn serde_uses_dotted_string() {
        let json = serde_json::to_string(&v("0.4.7.13")).unwrap();
        assert_eq!(json, "\"0.4.7.13\"");
        let back: TorVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v("0.4.7.13"));
    }

    #[test]
    fn serde_rejects_malformed_version() {
        assert!(serde_json::from_str::<TorVersion>("\"0.4.7\"").is_err());
    }
}

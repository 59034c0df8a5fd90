//! Target platform families.

/// Platform family a Tor bundle is built for.
///
/// Each family groups one or more target architectures behind a single
/// release artifact: `linux` covers aarch64, armhf and `x86_64`,
/// `windows` is `x86_64` mingw-w64, and `android` covers the four PIE
/// ABIs built through the NDK make harness.
///
/// # Example
///
/// ```
/// use trb_schema::Platform;
///
/// let p: Platform = "linux".parse().unwrap();
/// assert_eq!(p.as_str(), "linux");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Desktop Linux (aarch64, armhf and `x86_64` cross builds)
    Linux,
    /// Windows `x86_64` (mingw-w64 cross build)
    Windows,
    /// Android (armeabi-v7a, arm64-v8a, x86 and `x86_64` PIE builds)
    Android,
}

impl Platform {
    /// All platforms in release order.
    pub fn all() -> [Self; 3] {
        [Self::Linux, Self::Windows, Self::Android]
    }

    /// Convert to string representation
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Windows => "windows",
            Self::Android => "android",
        }
    }

    /// Capitalized name for user-facing messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Linux => "Linux",
            Self::Windows => "Windows",
            Self::Android => "Android",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linux" => Ok(Self::Linux),
            "windows" | "win" => Ok(Self::Windows),
            "android" => Ok(Self::Android),
            _ => Err(format!("Unknown platform: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_platforms() {
        assert_eq!("linux".parse::<Platform>().unwrap(), Platform::Linux);
        assert_eq!("Windows".parse::<Platform>().unwrap(), Platform::Windows);
        assert_eq!("android".parse::<Platform>().unwrap(), Platform::Android);
    }

    #[test]
    fn parse_unknown_platform_fails() {
        assert!("macos".parse::<Platform>().is_err());
    }

    #[test]
    fn all_is_release_ordered() {
        let names: Vec<&str> = Platform::all().iter().map(|p| p.as_str()).collect();
        assert_eq!(names, ["linux", "windows", "android"]);
    }
}

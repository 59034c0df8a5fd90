//! Normalized build environments.
//!
//! Each toolchain invocation receives an explicit, immutable variable
//! map built here. Maps start from a small determinism set and grow by
//! value; nothing ever mutates the pipeline's own process environment,
//! so two architectures can never contaminate each other through
//! leftover variables.
//!
//! The base set every build starts from:
//!
//! | Variable | Value |
//! |---|---|
//! | `SOURCE_DATE_EPOCH` | the release's fixed build time, as epoch seconds |
//! | `LC_ALL` | `C` (locale-independent tool output) |
//! | `TZ` | `UTC` (no host timezone in embedded timestamps) |
//!
//! Desktop drivers add compiler, linker, and prefix search paths on
//! top; the Android driver adds `ANDROID_NDK_HOME`, `APP_ABI`, and
//! `NDK_PLATFORM_LEVEL` per ABI.

use std::collections::BTreeMap;

use trb_schema::ReleaseDescriptor;

/// GCC flags that remove the compiler's own nondeterminism: branch
/// probability guessing and the randomized seed that feeds symbol
/// mangling.
pub const REPRODUCIBLE_GCC_CFLAGS: &str = "-fno-guess-branch-probability -frandom-seed=0";

/// An immutable-by-convention environment map for one invocation.
///
/// Builder methods consume and return the map, so each build step can
/// derive its own variant without affecting the one its caller holds.
#[derive(Debug, Clone, Default)]
pub struct BuildEnv {
    vars: BTreeMap<String, String>,
}

impl BuildEnv {
    /// The base determinism set for a release.
    pub fn for_release(descriptor: &ReleaseDescriptor) -> Self {
        Self::default()
            .with("SOURCE_DATE_EPOCH", descriptor.source_date_epoch())
            .with("LC_ALL", "C")
            .with("TZ", "UTC")
    }

    /// Set a variable, replacing any previous value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Append ` suffix` to an existing variable (or set it if absent).
    pub fn append(mut self, key: &str, suffix: &str) -> Self {
        match self.vars.get_mut(key) {
            Some(value) => {
                value.push(' ');
                value.push_str(suffix);
            }
            None => {
                self.vars.insert(key.to_string(), suffix.to_string());
            }
        }
        self
    }

    /// Read a variable back (mostly for tests and logging).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// The underlying map, sorted by key.
    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }
}

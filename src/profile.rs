use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::ProfileError;

/// Capability flags a profile can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Profile needs a GPU toolchain (CUDA drivers, accelerated builds).
    Gpu,
    /// Profile expects interpreters built with optimization flags.
    OptimizedInterpreter,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Gpu => "gpu",
            Capability::OptimizedInterpreter => "optimized-interpreter",
        }
    }

    /// Suffix used for the derived `DEVPROF_CAP_*` variable.
    pub fn env_suffix(self) -> &'static str {
        match self {
            Capability::Gpu => "GPU",
            Capability::OptimizedInterpreter => "OPTIMIZED_INTERPRETER",
        }
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gpu" => Ok(Capability::Gpu),
            "optimized-interpreter" => Ok(Capability::OptimizedInterpreter),
            other => Err(format!("unknown capability '{other}'")),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered set of capabilities. Hashable so it can be part of a memo key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, capability: Capability) {
        self.0.insert(capability);
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    pub fn extend(&mut self, other: &CapabilitySet) {
        self.0.extend(other.0.iter().copied());
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = self.iter().map(Capability::as_str).collect();
        f.write_str(&names.join(", "))
    }
}

/// Base definition of a package in the registry catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageSpec {
    pub name: String,
    /// Version label; also part of the default install prefix.
    pub version: Option<String>,
    /// Explicit install prefix; supports `~` and `$VAR` expansion.
    pub prefix: Option<String>,
    /// Subdirectories of the prefix that are added to `PATH`.
    pub bin: Vec<String>,
    pub flags: BTreeSet<String>,
    pub settings: BTreeMap<String, String>,
    pub env: BTreeMap<String, String>,
    /// Command whose first output line is reported as the tool version.
    pub version_command: Vec<String>,
}

impl PackageSpec {
    /// Plain package with no customizations, used for references missing from the catalog.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            prefix: None,
            bin: vec!["bin".to_string()],
            flags: BTreeSet::new(),
            settings: BTreeMap::new(),
            env: BTreeMap::new(),
            version_command: Vec::new(),
        }
    }
}

/// A named, immutable bundle of packages and build customizations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub description: Option<String>,
    /// Package references in declaration order (may repeat).
    pub packages: Vec<String>,
    /// Overlay names in declaration order.
    pub overlays: Vec<String>,
    pub capabilities: CapabilitySet,
    /// Profiles composed into this one ahead of its own entries.
    pub include: Vec<String>,
    pub env: BTreeMap<String, String>,
    /// Shell lines run by the caller after activation.
    pub hooks: Vec<String>,
}

impl Profile {
    pub fn new<P, O, C>(name: impl Into<String>, packages: P, overlays: O, capabilities: C) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
        C: IntoIterator<Item = Capability>,
    {
        Self {
            name: name.into(),
            description: None,
            packages: packages.into_iter().map(Into::into).collect(),
            overlays: overlays.into_iter().map(Into::into).collect(),
            capabilities: capabilities.into_iter().collect(),
            include: Vec::new(),
            env: BTreeMap::new(),
            hooks: Vec::new(),
        }
    }

    pub fn including<I>(mut self, profiles: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.include = profiles.into_iter().map(Into::into).collect();
        self
    }
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9][a-z0-9._-]*$").expect("name pattern is a valid regex")
    })
}

/// Reject names that would not survive a round trip through the CLI or a file name.
pub fn validate_name(kind: &'static str, name: &str) -> Result<(), ProfileError> {
    if name_pattern().is_match(name) {
        Ok(())
    } else {
        Err(ProfileError::InvalidName {
            kind,
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("default", true)]
    #[case("deep-learning", true)]
    #[case("python3.12", true)]
    #[case("gcc_13", true)]
    #[case("Deep", false)]
    #[case("-leading", false)]
    #[case("", false)]
    #[case("with space", false)]
    fn test_validate_name(#[case] name: &str, #[case] valid: bool) {
        assert_eq!(validate_name("profile", name).is_ok(), valid);
    }

    #[rstest]
    #[case("gpu", Some(Capability::Gpu))]
    #[case("GPU", Some(Capability::Gpu))]
    #[case("optimized-interpreter", Some(Capability::OptimizedInterpreter))]
    #[case("tpu", None)]
    fn test_capability_from_str(#[case] input: &str, #[case] expected: Option<Capability>) {
        assert_eq!(input.parse::<Capability>().ok(), expected);
    }

    #[test]
    fn test_capability_set_display_is_sorted() {
        let caps: CapabilitySet = [Capability::OptimizedInterpreter, Capability::Gpu]
            .into_iter()
            .collect();
        assert_eq!(caps.to_string(), "gpu, optimized-interpreter");
        assert_eq!(CapabilitySet::new().to_string(), "none");
    }

    #[test]
    fn test_capability_sets_differ_as_keys() {
        let gpu: CapabilitySet = [Capability::Gpu].into_iter().collect();
        assert_ne!(gpu, CapabilitySet::new());
    }

    #[test]
    fn test_package_spec_defaults_to_bin_dir() {
        let spec = PackageSpec::new("cmake");
        assert_eq!(spec.bin, vec!["bin"]);
        assert!(spec.version_command.is_empty());
    }

    #[test]
    fn test_profile_new_collects_fields() {
        let profile = Profile::new("cuda", ["gcc", "cudatoolkit"], ["python-optimized"], [Capability::Gpu])
            .including(["default"]);
        assert_eq!(profile.packages, vec!["gcc", "cudatoolkit"]);
        assert_eq!(profile.overlays, vec!["python-optimized"]);
        assert!(profile.capabilities.contains(Capability::Gpu));
        assert_eq!(profile.include, vec!["default"]);
    }
}

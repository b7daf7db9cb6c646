use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::profile::{Capability, CapabilitySet, PackageSpec};

/// A named transformation applied to one base package definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    pub name: String,
    /// Name of the base package this overlay customizes.
    pub target: String,
    pub flags: BTreeSet<String>,
    pub settings: BTreeMap<String, String>,
    pub env: BTreeMap<String, String>,
    pub version: Option<String>,
    /// Extra settings merged only when the resolving profile has the capability.
    pub with: BTreeMap<Capability, BTreeMap<String, String>>,
}

impl Overlay {
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            flags: BTreeSet::new(),
            settings: BTreeMap::new(),
            env: BTreeMap::new(),
            version: None,
            with: BTreeMap::new(),
        }
    }

    /// Effective changes this overlay makes under the given capability set.
    pub fn patch(&self, capabilities: &CapabilitySet) -> OverlayPatch {
        let mut settings = self.settings.clone();
        for (capability, extra) in &self.with {
            if capabilities.contains(*capability) {
                settings.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }

        OverlayPatch {
            overlay: self.name.clone(),
            flags: self.flags.clone(),
            settings,
            env: self.env.clone(),
            version: self.version.clone(),
        }
    }

    /// Apply this overlay to a copy of `base`.
    pub fn apply(&self, base: &PackageSpec, capabilities: &CapabilitySet) -> PackageSpec {
        let mut spec = base.clone();
        self.patch(capabilities).apply_to(&mut spec);
        spec
    }
}

/// The capability-specific result of an overlay, ready to merge into a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlayPatch {
    pub overlay: String,
    pub flags: BTreeSet<String>,
    pub settings: BTreeMap<String, String>,
    pub env: BTreeMap<String, String>,
    pub version: Option<String>,
}

impl OverlayPatch {
    /// Merge into `spec`. Union and insert only, so applying twice equals applying once.
    pub fn apply_to(&self, spec: &mut PackageSpec) {
        spec.flags.extend(self.flags.iter().cloned());
        spec.settings
            .extend(self.settings.iter().map(|(k, v)| (k.clone(), v.clone())));
        spec.env
            .extend(self.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        if let Some(version) = &self.version {
            spec.version = Some(version.clone());
        }
    }

    /// First key both patches set to different values, if any.
    pub fn conflict_with(&self, other: &OverlayPatch) -> Option<String> {
        if let (Some(a), Some(b)) = (&self.version, &other.version) {
            if a != b {
                return Some("version".to_string());
            }
        }

        for (key, value) in &self.settings {
            if other.settings.get(key).is_some_and(|theirs| theirs != value) {
                return Some(format!("settings.{key}"));
            }
        }

        for (key, value) in &self.env {
            if other.env.get(key).is_some_and(|theirs| theirs != value) {
                return Some(format!("env.{key}"));
            }
        }

        None
    }
}

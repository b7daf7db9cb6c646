use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, trace};

use crate::error::ProfileError;
use crate::overlay::{Overlay, OverlayPatch};
use crate::profile::{CapabilitySet, PackageSpec, Profile};
use crate::registry::Registry;

/// A package after all of the profile's overlays have been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPackage {
    #[serde(flatten)]
    pub spec: PackageSpec,
    /// Overlays applied to this package, in declaration order.
    pub overlays: Vec<String>,
}

impl ResolvedPackage {
    pub fn name(&self) -> &str {
        &self.spec.name
    }
}

/// Fully expanded profile, ready to materialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedEnvironment {
    pub profile: String,
    pub description: Option<String>,
    pub capabilities: CapabilitySet,
    pub packages: Vec<ResolvedPackage>,
    pub env: BTreeMap<String, String>,
    pub hooks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MemoKey {
    package: String,
    overlay: String,
    capabilities: CapabilitySet,
}

/// Profile definition with includes expanded.
#[derive(Debug, Default)]
struct Flattened {
    packages: Vec<String>,
    overlays: Vec<String>,
    capabilities: CapabilitySet,
    env: BTreeMap<String, String>,
    hooks: Vec<String>,
}

/// One resolution run over a registry.
///
/// Overlay results are memoized per package, overlay and capability set for
/// the lifetime of the resolver, so profiles sharing an overlay reuse the same
/// application. Create a new resolver for every activation.
pub struct Resolver<'a> {
    registry: &'a Registry,
    memo: HashMap<MemoKey, OverlayPatch>,
    applications: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            memo: HashMap::new(),
            applications: 0,
        }
    }

    /// Number of overlay applications computed (memo misses) in this run.
    pub fn applications(&self) -> usize {
        self.applications
    }

    pub fn resolve_name(&mut self, name: &str) -> Result<ResolvedEnvironment, ProfileError> {
        let registry = self.registry;
        let profile = registry.lookup(name)?;
        self.resolve(profile)
    }

    pub fn resolve(&mut self, profile: &Profile) -> Result<ResolvedEnvironment, ProfileError> {
        let registry = self.registry;
        let mut flat = Flattened::default();
        let mut stack = Vec::new();
        self.flatten_into(profile, &mut stack, &mut flat)?;

        let packages = dedup_preserving_order(flat.packages);
        let present: HashSet<&str> = packages.iter().map(String::as_str).collect();

        // Look up every overlay first so unknown names fail before any work is done.
        let mut overlays: Vec<&Overlay> = Vec::new();
        for name in dedup_preserving_order(flat.overlays) {
            let overlay = registry
                .overlay(&name)
                .ok_or_else(|| ProfileError::UnknownOverlay {
                    profile: profile.name.clone(),
                    overlay: name.clone(),
                })?;
            overlays.push(overlay);
        }

        let mut by_target: BTreeMap<&str, Vec<OverlayPatch>> = BTreeMap::new();
        for overlay in overlays {
            if !present.contains(overlay.target.as_str()) {
                debug!(
                    profile = %profile.name,
                    overlay = %overlay.name,
                    target = %overlay.target,
                    "overlay target not in package set, skipping"
                );
                continue;
            }
            let patch = self.patch_for(overlay, &flat.capabilities);
            by_target
                .entry(overlay.target.as_str())
                .or_default()
                .push(patch);
        }

        for (package, patches) in &by_target {
            check_conflicts(&profile.name, package, patches)?;
        }

        let resolved = packages
            .iter()
            .map(|name| {
                let mut spec = registry.package(name);
                let mut applied = Vec::new();
                if let Some(patches) = by_target.get(name.as_str()) {
                    for patch in patches {
                        patch.apply_to(&mut spec);
                        applied.push(patch.overlay.clone());
                    }
                }
                ResolvedPackage {
                    spec,
                    overlays: applied,
                }
            })
            .collect();

        Ok(ResolvedEnvironment {
            profile: profile.name.clone(),
            description: profile.description.clone(),
            capabilities: flat.capabilities,
            packages: resolved,
            env: flat.env,
            hooks: flat.hooks,
        })
    }

    fn patch_for(&mut self, overlay: &Overlay, capabilities: &CapabilitySet) -> OverlayPatch {
        let key = MemoKey {
            package: overlay.target.clone(),
            overlay: overlay.name.clone(),
            capabilities: capabilities.clone(),
        };

        if let Some(patch) = self.memo.get(&key) {
            trace!(overlay = %overlay.name, "reusing memoized overlay");
            return patch.clone();
        }

        debug!(
            overlay = %overlay.name,
            target = %overlay.target,
            capabilities = %capabilities,
            "applying overlay"
        );
        let patch = overlay.patch(capabilities);
        self.applications += 1;
        self.memo.insert(key, patch.clone());
        patch
    }

    fn flatten_into(
        &self,
        profile: &Profile,
        stack: &mut Vec<String>,
        out: &mut Flattened,
    ) -> Result<(), ProfileError> {
        if stack.contains(&profile.name) {
            let mut chain = stack.clone();
            chain.push(profile.name.clone());
            return Err(ProfileError::IncludeCycle(chain));
        }
        stack.push(profile.name.clone());

        for include in &profile.include {
            let included = self.registry.lookup(include)?;
            self.flatten_into(included, stack, out)?;
        }

        out.packages.extend(profile.packages.iter().cloned());
        out.overlays.extend(profile.overlays.iter().cloned());
        out.capabilities.extend(&profile.capabilities);
        out.env
            .extend(profile.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        for hook in &profile.hooks {
            if !out.hooks.contains(hook) {
                out.hooks.push(hook.clone());
            }
        }

        stack.pop();
        Ok(())
    }
}

fn check_conflicts(
    profile: &str,
    package: &str,
    patches: &[OverlayPatch],
) -> Result<(), ProfileError> {
    for (idx, first) in patches.iter().enumerate() {
        for second in &patches[idx + 1..] {
            if let Some(key) = first.conflict_with(second) {
                return Err(ProfileError::OverlayConflict {
                    profile: profile.to_string(),
                    package: package.to_string(),
                    first: first.overlay.clone(),
                    second: second.overlay.clone(),
                    key,
                });
            }
        }
    }
    Ok(())
}

fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

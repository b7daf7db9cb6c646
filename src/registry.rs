use std::collections::BTreeMap;

use crate::error::ProfileError;
use crate::overlay::Overlay;
use crate::profile::{validate_name, PackageSpec, Profile};

/// Profile name used when nothing else is configured.
pub const DEFAULT_PROFILE: &str = "default";

/// Profile names shipped in the built-in registry.
pub const BUILTIN_PROFILES: &[&str] = &["default", "cpp", "cuda", "deep-learning", "all"];

/// In-memory catalog of profiles, packages and overlays.
///
/// Populated once at configuration load time and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    profiles: BTreeMap<String, Profile>,
    packages: BTreeMap<String, PackageSpec>,
    overlays: BTreeMap<String, Overlay>,
    default_profile: Option<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, profile: Profile) -> Result<(), ProfileError> {
        validate_name("profile", &profile.name)?;
        if self.profiles.contains_key(&profile.name) {
            return Err(ProfileError::DuplicateProfile(profile.name));
        }
        self.profiles.insert(profile.name.clone(), profile);
        Ok(())
    }

    pub fn register_package(&mut self, package: PackageSpec) -> Result<(), ProfileError> {
        validate_name("package", &package.name)?;
        if self.packages.contains_key(&package.name) {
            return Err(ProfileError::DuplicatePackage(package.name));
        }
        self.packages.insert(package.name.clone(), package);
        Ok(())
    }

    pub fn register_overlay(&mut self, overlay: Overlay) -> Result<(), ProfileError> {
        validate_name("overlay", &overlay.name)?;
        if self.overlays.contains_key(&overlay.name) {
            return Err(ProfileError::DuplicateOverlay(overlay.name));
        }
        self.overlays.insert(overlay.name.clone(), overlay);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&Profile, ProfileError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ProfileError::UnknownProfile(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    /// Catalog entry for `name`, or a plain spec when the catalog has none.
    pub fn package(&self, name: &str) -> PackageSpec {
        self.packages
            .get(name)
            .cloned()
            .unwrap_or_else(|| PackageSpec::new(name))
    }

    pub fn overlay(&self, name: &str) -> Option<&Overlay> {
        self.overlays.get(name)
    }

    /// Profile names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }

    pub fn overlays(&self) -> impl Iterator<Item = &Overlay> {
        self.overlays.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn set_default_profile(&mut self, name: impl Into<String>) {
        self.default_profile = Some(name.into());
    }

    /// Declared default profile, falling back to [`DEFAULT_PROFILE`].
    pub fn default_profile(&self) -> &str {
        self.default_profile.as_deref().unwrap_or(DEFAULT_PROFILE)
    }

    /// Fail with `InvalidDefault` unless `name` is registered.
    pub fn ensure_default(&self, name: &str) -> Result<(), ProfileError> {
        if self.contains(name) {
            Ok(())
        } else {
            Err(ProfileError::InvalidDefault(name.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Capability;

    fn registry_with_default() -> Registry {
        let mut registry = Registry::new();
        registry
            .register(Profile::new(
                "default",
                ["python3", "pip"],
                Vec::<String>::new(),
                [],
            ))
            .unwrap();
        registry
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = registry_with_default();
        let profile = registry.lookup("default").unwrap();
        assert_eq!(profile.packages, vec!["python3", "pip"]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_duplicate_profile() {
        let mut registry = registry_with_default();
        let result = registry.register(Profile::new(
            "default",
            ["gcc"],
            Vec::<String>::new(),
            [Capability::Gpu],
        ));
        assert_eq!(
            result,
            Err(ProfileError::DuplicateProfile("default".to_string()))
        );
        // Original definition is untouched.
        assert_eq!(
            registry.lookup("default").unwrap().packages,
            vec!["python3", "pip"]
        );
    }

    #[test]
    fn test_lookup_unknown_profile() {
        let registry = registry_with_default();
        assert_eq!(
            registry.lookup("rust"),
            Err(ProfileError::UnknownProfile("rust".to_string()))
        );
    }

    #[test]
    fn test_register_rejects_invalid_name() {
        let mut registry = Registry::new();
        let result = registry.register(Profile::new("Deep Learning", ["x"], Vec::<String>::new(), []));
        assert!(matches!(result, Err(ProfileError::InvalidName { .. })));
    }

    #[test]
    fn test_duplicate_overlay_and_package() {
        let mut registry = Registry::new();
        registry
            .register_overlay(Overlay::new("python-optimized", "python3"))
            .unwrap();
        assert_eq!(
            registry.register_overlay(Overlay::new("python-optimized", "python3")),
            Err(ProfileError::DuplicateOverlay("python-optimized".to_string()))
        );

        registry.register_package(PackageSpec::new("gcc")).unwrap();
        assert_eq!(
            registry.register_package(PackageSpec::new("gcc")),
            Err(ProfileError::DuplicatePackage("gcc".to_string()))
        );
    }

    #[test]
    fn test_package_falls_back_to_plain_spec() {
        let registry = Registry::new();
        assert_eq!(registry.package("ninja"), PackageSpec::new("ninja"));
    }

    #[test]
    fn test_default_profile_validation() {
        let mut registry = registry_with_default();
        assert_eq!(registry.default_profile(), "default");
        assert!(registry.ensure_default("default").is_ok());

        registry.set_default_profile("cpp");
        assert_eq!(registry.default_profile(), "cpp");
        assert_eq!(
            registry.ensure_default("cpp"),
            Err(ProfileError::InvalidDefault("cpp".to_string()))
        );
    }

    #[test]
    fn test_names_are_sorted() {
        let mut registry = registry_with_default();
        registry
            .register(Profile::new("all", ["gcc"], Vec::<String>::new(), []))
            .unwrap();
        registry
            .register(Profile::new("cpp", ["gcc"], Vec::<String>::new(), []))
            .unwrap();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["all", "cpp", "default"]);
    }
}

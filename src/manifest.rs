use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::overlay::Overlay;
use crate::profile::{Capability, PackageSpec, Profile};
use crate::registry::Registry;

/// Registry shipped with the binary; also the template written by `devprof init`.
pub const BUILTIN_MANIFEST: &str = include_str!("../templates/devprof.toml");

/// Raw `[packages.<name>]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageToml {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// `None` keeps the default `bin` directory; an explicit empty list adds nothing to PATH.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub settings: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub version_command: Vec<String>,
}

impl PackageToml {
    fn into_spec(self, name: &str) -> PackageSpec {
        let mut spec = PackageSpec::new(name);
        spec.version = self.version;
        spec.prefix = self.prefix;
        if let Some(bin) = self.bin {
            spec.bin = bin;
        }
        spec.flags = self.flags.into_iter().collect();
        spec.settings = self.settings;
        spec.env = self.env;
        spec.version_command = self.version_command;
        spec
    }
}

/// Raw `[overlays.<name>]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverlayToml {
    pub target: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub settings: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Capability name to extra settings, e.g. `[overlays.x.with.gpu]`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub with: BTreeMap<String, BTreeMap<String, String>>,
}

impl OverlayToml {
    fn into_overlay(self, name: &str) -> Result<Overlay> {
        let mut overlay = Overlay::new(name, self.target);
        overlay.flags = self.flags.into_iter().collect();
        overlay.settings = self.settings;
        overlay.env = self.env;
        overlay.version = self.version;
        for (capability, settings) in self.with {
            let capability: Capability = capability
                .parse()
                .map_err(|message: String| anyhow!("overlay '{name}': {message}"))?;
            overlay.with.insert(capability, settings);
        }
        Ok(overlay)
    }
}

/// Raw `[profiles.<name>]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileToml {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overlays: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<Capability>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hooks: Vec<String>,
}

impl ProfileToml {
    fn into_profile(self, name: &str) -> Profile {
        let mut profile = Profile::new(name, self.packages, self.overlays, self.capabilities)
            .including(self.include);
        profile.description = self.description;
        profile.env = self.env;
        profile.hooks = self.hooks;
        profile
    }
}

/// One registry file (`devprof.toml` or a `devprof.d/*.toml` fragment).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub packages: BTreeMap<String, PackageToml>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overlays: BTreeMap<String, OverlayToml>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub profiles: BTreeMap<String, ProfileToml>,
}

impl RegistryFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read registry file {:?}", path))?;

        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        Self::parse(&contents).with_context(|| format!("Failed to parse registry file {:?}", path))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN_MANIFEST).context("Built-in registry is invalid")
    }
}

/// Where the active registry was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrySource {
    Builtin,
    Files(Vec<PathBuf>),
}

/// All registry files for a project, in load order.
#[derive(Debug, Clone)]
pub struct ManifestSet {
    source: RegistrySource,
    files: Vec<(Option<PathBuf>, RegistryFile)>,
}

impl ManifestSet {
    /// Load `manifest` plus sorted `*.toml` fragments from `fragments_dir`.
    ///
    /// Falls back to the built-in registry when `manifest` does not exist.
    pub fn load(manifest: &Path, fragments_dir: &Path) -> Result<Self> {
        if !manifest.exists() {
            return Ok(Self {
                source: RegistrySource::Builtin,
                files: vec![(None, RegistryFile::builtin()?)],
            });
        }

        let mut paths = vec![manifest.to_path_buf()];
        if fragments_dir.is_dir() {
            let mut fragments = Vec::new();
            for entry in fs::read_dir(fragments_dir)
                .with_context(|| format!("Failed to read fragments directory {:?}", fragments_dir))?
            {
                let path = entry?.path();
                if path.is_file() && path.extension().is_some_and(|ext| ext == "toml") {
                    fragments.push(path);
                }
            }
            fragments.sort();
            paths.extend(fragments);
        }

        let mut files = Vec::with_capacity(paths.len());
        for path in &paths {
            files.push((Some(path.clone()), RegistryFile::load(path)?));
        }

        Ok(Self {
            source: RegistrySource::Files(paths),
            files,
        })
    }

    pub fn builtin() -> Result<Self> {
        Ok(Self {
            source: RegistrySource::Builtin,
            files: vec![(None, RegistryFile::builtin()?)],
        })
    }

    pub fn source(&self) -> &RegistrySource {
        &self.source
    }

    /// Register every package, overlay and profile. Definitions repeated across files are errors.
    pub fn into_registry(self) -> Result<Registry> {
        let mut registry = Registry::new();
        let mut default_from: Option<String> = None;

        for (idx, (path, file)) in self.files.into_iter().enumerate() {
            let origin = path
                .as_ref()
                .map(|p| format!("{:?}", p))
                .unwrap_or_else(|| "built-in registry".to_string());

            if let Some(default) = file.default_profile {
                if idx > 0 {
                    bail!("{origin}: default_profile may only be set in the main devprof.toml");
                }
                default_from = Some(default);
            }

            for (name, package) in file.packages {
                registry
                    .register_package(package.into_spec(&name))
                    .with_context(|| format!("While loading {origin}"))?;
            }

            for (name, overlay) in file.overlays {
                let overlay = overlay
                    .into_overlay(&name)
                    .with_context(|| format!("While loading {origin}"))?;
                registry
                    .register_overlay(overlay)
                    .with_context(|| format!("While loading {origin}"))?;
            }

            for (name, profile) in file.profiles {
                registry
                    .register(profile.into_profile(&name))
                    .with_context(|| format!("While loading {origin}"))?;
            }
        }

        if let Some(default) = default_from {
            registry.set_default_profile(default);
        }

        Ok(registry)
    }
}

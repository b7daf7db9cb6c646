use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::probe::VersionProbe;
use crate::resolver::{ResolvedEnvironment, ResolvedPackage};

/// Text reported in place of a version when the tool could not be queried.
pub const UNAVAILABLE: &str = "(unavailable)";

/// Everything the caller needs to activate a resolved environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationResult {
    pub profile: String,
    /// Directories to prepend to `PATH`, highest precedence first.
    pub path: Vec<PathBuf>,
    pub variables: BTreeMap<String, String>,
    pub hooks: Vec<String>,
    pub diagnostics: Vec<String>,
}

/// Turns a [`ResolvedEnvironment`] into an [`ActivationResult`].
///
/// Never touches the process environment; probes are the only side effect.
pub struct Materializer<P> {
    prefix_root: PathBuf,
    probe: P,
}

impl<P: VersionProbe> Materializer<P> {
    pub fn new(prefix_root: impl Into<PathBuf>, probe: P) -> Self {
        Self {
            prefix_root: prefix_root.into(),
            probe,
        }
    }

    pub fn materialize(&self, env: &ResolvedEnvironment) -> ActivationResult {
        let mut path: Vec<PathBuf> = Vec::new();
        for package in &env.packages {
            let prefix = self.prefix_for(package);
            for bin in &package.spec.bin {
                let entry = prefix.join(bin);
                if !path.contains(&entry) {
                    path.push(entry);
                }
            }
        }

        let mut variables = BTreeMap::new();
        for package in &env.packages {
            variables.extend(
                package
                    .spec
                    .env
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            );
        }
        variables.extend(env.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        variables.insert("DEVPROF_ACTIVE_PROFILE".to_string(), env.profile.clone());
        variables.insert(
            "DEVPROF_PACKAGES".to_string(),
            env.packages
                .iter()
                .map(ResolvedPackage::name)
                .collect::<Vec<_>>()
                .join(" "),
        );
        for capability in env.capabilities.iter() {
            variables.insert(
                format!("DEVPROF_CAP_{}", capability.env_suffix()),
                "1".to_string(),
            );
        }

        let mut diagnostics = vec![format!(
            "profile {} ({} packages)",
            env.profile,
            env.packages.len()
        )];
        for package in &env.packages {
            if package.spec.version_command.is_empty() {
                continue;
            }
            let version = match self.probe.probe(&package.spec.version_command, &path) {
                Ok(line) => line,
                Err(error) => {
                    warn!(package = %package.name(), %error, "version probe failed");
                    UNAVAILABLE.to_string()
                }
            };
            diagnostics.push(format!("{}: {}", package.name(), version));
        }

        debug!(
            profile = %env.profile,
            path_entries = path.len(),
            variables = variables.len(),
            "materialized environment"
        );

        ActivationResult {
            profile: env.profile.clone(),
            path,
            variables,
            hooks: env.hooks.clone(),
            diagnostics,
        }
    }

    fn prefix_for(&self, package: &ResolvedPackage) -> PathBuf {
        if let Some(prefix) = &package.spec.prefix {
            return expand_prefix(prefix);
        }
        let dir = match &package.spec.version {
            Some(version) => format!("{}-{}", package.name(), version),
            None => package.name().to_string(),
        };
        self.prefix_root.join(dir)
    }
}

fn expand_prefix(prefix: &str) -> PathBuf {
    match shellexpand::full(prefix) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(error) => {
            warn!(%prefix, %error, "could not expand package prefix, using it verbatim");
            Path::new(prefix).to_path_buf()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::Overlay;
    use crate::probe::ProbeError;
    use crate::profile::{Capability, PackageSpec, Profile};
    use crate::registry::Registry;
    use crate::resolver::Resolver;
    use crate::selector::DEFAULT_OVERRIDE_VAR;
    use serial_test::serial;
    use std::cell::RefCell;

    /// Answers from a fixed table; everything else is "not installed".
    #[derive(Default)]
    struct FakeProbe {
        versions: BTreeMap<String, String>,
        calls: RefCell<Vec<Vec<PathBuf>>>,
    }

    impl VersionProbe for FakeProbe {
        fn probe(&self, command: &[String], path: &[PathBuf]) -> Result<String, ProbeError> {
            self.calls.borrow_mut().push(path.to_vec());
            self.versions
                .get(&command[0])
                .cloned()
                .ok_or_else(|| ProbeError::Spawn {
                    command: command.join(" "),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                })
        }
    }

    fn resolved() -> ResolvedEnvironment {
        let mut registry = Registry::new();

        let mut python = PackageSpec::new("python3");
        python.version = Some("3.12".to_string());
        python.version_command = vec!["python3".to_string(), "--version".to_string()];
        python
            .env
            .insert("PYTHONNOUSERSITE".to_string(), "1".to_string());
        registry.register_package(python).unwrap();

        let mut nvcc = PackageSpec::new("cudatoolkit");
        nvcc.prefix = Some("/opt/cuda".to_string());
        nvcc.bin = vec!["bin".to_string(), "nvvm/bin".to_string()];
        nvcc.version_command = vec!["nvcc".to_string(), "--version".to_string()];
        registry.register_package(nvcc).unwrap();

        let mut overlay = Overlay::new("python-optimized", "python3");
        overlay
            .env
            .insert("PYTHONOPTIMIZE".to_string(), "1".to_string());
        registry.register_overlay(overlay).unwrap();

        let mut profile = Profile::new(
            "cuda",
            ["python3", "cudatoolkit", "ripgrep"],
            ["python-optimized"],
            [Capability::Gpu],
        );
        profile
            .env
            .insert("CUDA_PATH".to_string(), "/opt/cuda".to_string());
        profile.hooks.push("ulimit -n 4096".to_string());
        registry.register(profile).unwrap();

        Resolver::new(&registry).resolve_name("cuda").unwrap()
    }

    #[test]
    fn path_follows_resolved_order() {
        let materializer = Materializer::new("/state/packages", FakeProbe::default());
        let result = materializer.materialize(&resolved());

        assert_eq!(
            result.path,
            vec![
                PathBuf::from("/state/packages/python3-3.12/bin"),
                PathBuf::from("/opt/cuda/bin"),
                PathBuf::from("/opt/cuda/nvvm/bin"),
                PathBuf::from("/state/packages/ripgrep/bin"),
            ]
        );
    }

    #[test]
    fn variables_include_derived_values() {
        let materializer = Materializer::new("/state/packages", FakeProbe::default());
        let result = materializer.materialize(&resolved());

        assert_eq!(result.variables["DEVPROF_ACTIVE_PROFILE"], "cuda");
        assert_eq!(
            result.variables["DEVPROF_PACKAGES"],
            "python3 cudatoolkit ripgrep"
        );
        assert_eq!(result.variables["DEVPROF_CAP_GPU"], "1");
        assert_eq!(result.variables["PYTHONOPTIMIZE"], "1");
        assert_eq!(result.variables["PYTHONNOUSERSITE"], "1");
        assert_eq!(result.variables["CUDA_PATH"], "/opt/cuda");
        assert_eq!(result.hooks, vec!["ulimit -n 4096"]);
    }

    #[test]
    fn derived_variables_never_set_override_variable() {
        let materializer = Materializer::new("/state/packages", FakeProbe::default());
        let result = materializer.materialize(&resolved());

        // Evaluating the activation must not pin the profile for later selections.
        assert!(!result.variables.contains_key(DEFAULT_OVERRIDE_VAR));
    }

    #[test]
    fn missing_tool_gets_placeholder_line() {
        let probe = FakeProbe {
            versions: BTreeMap::from([("python3".to_string(), "Python 3.12.1".to_string())]),
            ..Default::default()
        };
        let materializer = Materializer::new("/state/packages", probe);
        let result = materializer.materialize(&resolved());

        assert_eq!(
            result.diagnostics,
            vec![
                "profile cuda (3 packages)".to_string(),
                "python3: Python 3.12.1".to_string(),
                format!("cudatoolkit: {UNAVAILABLE}"),
            ]
        );
    }

    #[test]
    fn probes_see_activation_path() {
        let materializer = Materializer::new("/state/packages", FakeProbe::default());
        let result = materializer.materialize(&resolved());

        let calls = materializer.probe.calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], result.path);
    }

    #[test]
    #[serial]
    fn prefix_expands_environment_variables() {
        std::env::set_var("DEVPROF_TEST_PREFIX_ROOT", "/custom");
        assert_eq!(
            expand_prefix("$DEVPROF_TEST_PREFIX_ROOT/llvm"),
            PathBuf::from("/custom/llvm")
        );
        std::env::remove_var("DEVPROF_TEST_PREFIX_ROOT");
    }
}

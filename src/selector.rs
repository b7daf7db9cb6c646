use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::ProfileError;
use crate::registry::Registry;

/// Environment variable consulted when no local override file exists.
pub const DEFAULT_OVERRIDE_VAR: &str = "DEVPROF_PROFILE";

/// Where an override value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideSource {
    File(PathBuf),
    Env(String),
}

impl fmt::Display for OverrideSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverrideSource::File(path) => write!(f, "{}", path.display()),
            OverrideSource::Env(var) => write!(f, "${var}"),
        }
    }
}

/// A profile name requested by the user or project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileOverride {
    pub name: String,
    pub source: OverrideSource,
}

impl ProfileOverride {
    pub fn new(name: impl Into<String>, source: OverrideSource) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }
}

/// Reads the override from the local file, then the environment variable.
#[derive(Debug, Clone)]
pub struct OverrideReader {
    file: PathBuf,
    env_var: String,
}

impl OverrideReader {
    pub fn new(file: impl Into<PathBuf>, env_var: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            env_var: env_var.into(),
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Single read of each source, no retry. Absence is not an error.
    pub fn read(&self) -> Option<ProfileOverride> {
        if let Some(name) = read_override_file(&self.file) {
            debug!(file = %self.file.display(), %name, "profile override from file");
            return Some(ProfileOverride::new(
                name,
                OverrideSource::File(self.file.clone()),
            ));
        }

        let value = env::var(&self.env_var).ok()?;
        let name = value.trim();
        if name.is_empty() {
            return None;
        }
        debug!(var = %self.env_var, %name, "profile override from environment");
        Some(ProfileOverride::new(
            name,
            OverrideSource::Env(self.env_var.clone()),
        ))
    }
}

fn read_override_file(path: &Path) -> Option<String> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(error) => {
            if error.kind() != std::io::ErrorKind::NotFound {
                warn!(file = %path.display(), %error, "could not read profile override file");
            }
            return None;
        }
    };

    contents
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
}

/// Non-fatal notice that an override named a profile the registry does not know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownProfileWarning {
    pub requested: String,
    pub source: OverrideSource,
    pub fallback: String,
}

impl fmt::Display for UnknownProfileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown profile '{}' (from {}); using '{}'",
            self.requested, self.source, self.fallback
        )
    }
}

/// How the active profile was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOrigin {
    Override(OverrideSource),
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub name: String,
    pub origin: SelectionOrigin,
    pub warning: Option<UnknownProfileWarning>,
}

/// Pick the active profile name.
///
/// The default is validated first: an unregistered default is a
/// configuration error regardless of the override.
pub fn select(
    registry: &Registry,
    requested: Option<&ProfileOverride>,
    default_name: &str,
) -> Result<Selection, ProfileError> {
    registry.ensure_default(default_name)?;

    let Some(requested) = requested else {
        return Ok(Selection {
            name: default_name.to_string(),
            origin: SelectionOrigin::Default,
            warning: None,
        });
    };

    if registry.contains(&requested.name) {
        return Ok(Selection {
            name: requested.name.clone(),
            origin: SelectionOrigin::Override(requested.source.clone()),
            warning: None,
        });
    }

    let warning = UnknownProfileWarning {
        requested: requested.name.clone(),
        source: requested.source.clone(),
        fallback: default_name.to_string(),
    };
    debug!(requested = %warning.requested, fallback = %warning.fallback, "override names an unknown profile");

    Ok(Selection {
        name: default_name.to_string(),
        origin: SelectionOrigin::Default,
        warning: Some(warning),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Profile;
    use serial_test::serial;
    use tempfile::TempDir;

    const TEST_VAR: &str = "DEVPROF_SELECTOR_TEST_PROFILE";

    fn registry() -> Registry {
        let mut registry = Registry::new();
        for name in ["default", "cpp", "cuda"] {
            registry
                .register(Profile::new(name, ["gcc"], Vec::<String>::new(), []))
                .unwrap();
        }
        registry
    }

    fn env_override(name: &str) -> ProfileOverride {
        ProfileOverride::new(name, OverrideSource::Env(TEST_VAR.to_string()))
    }

    #[test]
    fn test_registered_override_wins() {
        let selection = select(&registry(), Some(&env_override("cuda")), "default").unwrap();
        assert_eq!(selection.name, "cuda");
        assert_eq!(
            selection.origin,
            SelectionOrigin::Override(OverrideSource::Env(TEST_VAR.to_string()))
        );
        assert!(selection.warning.is_none());
    }

    #[test]
    fn test_unknown_override_falls_back_with_one_warning() {
        let selection =
            select(&registry(), Some(&env_override("nonexistent")), "default").unwrap();
        assert_eq!(selection.name, "default");
        assert_eq!(selection.origin, SelectionOrigin::Default);

        let warning = selection.warning.expect("warning for unknown override");
        assert_eq!(warning.requested, "nonexistent");
        assert_eq!(warning.fallback, "default");
        assert!(warning.to_string().contains("nonexistent"));
    }

    #[test]
    fn test_absent_override_returns_default_silently() {
        let selection = select(&registry(), None, "default").unwrap();
        assert_eq!(selection.name, "default");
        assert!(selection.warning.is_none());
    }

    #[test]
    fn test_missing_default_is_fatal() {
        let mut registry = Registry::new();
        registry
            .register(Profile::new("cpp", ["gcc"], Vec::<String>::new(), []))
            .unwrap();

        // Even a valid override cannot rescue an invalid default.
        let result = select(&registry, Some(&env_override("cpp")), "default");
        assert_eq!(
            result,
            Err(ProfileError::InvalidDefault("default".to_string()))
        );
    }

    #[test]
    #[serial]
    fn test_reader_prefers_file_over_env() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join(".devprof-profile");
        std::fs::write(&file, "# pinned locally\n\ncpp\n").unwrap();
        env::set_var(TEST_VAR, "cuda");

        let reader = OverrideReader::new(&file, TEST_VAR);
        let found = reader.read().unwrap();
        assert_eq!(found.name, "cpp");
        assert_eq!(found.source, OverrideSource::File(file.clone()));

        env::remove_var(TEST_VAR);
    }

    #[test]
    #[serial]
    fn test_reader_uses_env_when_file_missing() {
        let temp = TempDir::new().unwrap();
        env::set_var(TEST_VAR, "  cuda ");

        let reader = OverrideReader::new(temp.path().join(".devprof-profile"), TEST_VAR);
        let found = reader.read().unwrap();
        assert_eq!(found.name, "cuda");
        assert_eq!(found.source, OverrideSource::Env(TEST_VAR.to_string()));

        env::remove_var(TEST_VAR);
    }

    #[test]
    #[serial]
    fn test_reader_treats_empty_values_as_absent() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join(".devprof-profile");
        std::fs::write(&file, "\n   \n# comment only\n").unwrap();
        env::set_var(TEST_VAR, "   ");

        let reader = OverrideReader::new(&file, TEST_VAR);
        assert!(reader.read().is_none());

        env::remove_var(TEST_VAR);
    }
}

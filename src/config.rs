use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::probe::DEFAULT_PROBE_TIMEOUT_MS;
use crate::selector::DEFAULT_OVERRIDE_VAR;

/// User settings stored in `$XDG_CONFIG_HOME/devprof/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upper bound for each version probe.
    pub probe_timeout_ms: u64,
    /// Root under which package prefixes live; defaults to the state directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix_root: Option<String>,
    /// Environment variable read when no local override file exists.
    pub env_var: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            prefix_root: None,
            env_var: DEFAULT_OVERRIDE_VAR.to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse config file {:?}", path))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let contents =
            toml::to_string_pretty(self).context("Failed to serialize devprof config file")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {:?}", path))?;
        Ok(())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms.max(1))
    }

    /// Configured prefix root with `~` and variables expanded.
    pub fn prefix_root(&self) -> Result<Option<PathBuf>> {
        self.prefix_root
            .as_deref()
            .map(|raw| {
                shellexpand::full(raw)
                    .map(|expanded| PathBuf::from(expanded.as_ref()))
                    .with_context(|| format!("Failed to expand prefix_root {:?}", raw))
            })
            .transpose()
    }
}

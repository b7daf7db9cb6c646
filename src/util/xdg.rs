use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

fn home_dir() -> Result<PathBuf> {
    directories::BaseDirs::new()
        .context("Failed to get home directory")
        .map(|bd| bd.home_dir().to_path_buf())
}

fn xdg_base(var: &str, fallback: &str) -> Result<PathBuf> {
    match env::var_os(var).filter(|value| !value.is_empty()) {
        Some(value) => Ok(PathBuf::from(value)),
        None => Ok(home_dir()?.join(fallback)),
    }
}

/// Get the XDG config directory for devprof
///
/// Returns `$XDG_CONFIG_HOME/devprof` or `~/.config/devprof` if not set
pub fn config_dir() -> Result<PathBuf> {
    Ok(xdg_base("XDG_CONFIG_HOME", ".config")?.join("devprof"))
}

/// Get the XDG state directory for devprof
///
/// Returns `$XDG_STATE_HOME/devprof` or `~/.local/state/devprof` if not set
pub fn state_dir() -> Result<PathBuf> {
    Ok(xdg_base("XDG_STATE_HOME", ".local/state")?.join("devprof"))
}

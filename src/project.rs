use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::activation::{Activation, Pipeline};
use crate::config::Config;
use crate::manifest::{ManifestSet, BUILTIN_MANIFEST};
use crate::materialize::Materializer;
use crate::probe::CommandProbe;
use crate::registry::Registry;
use crate::selector::OverrideReader;
use crate::util::xdg;

pub const MANIFEST_FILE: &str = "devprof.toml";
pub const FRAGMENTS_DIR: &str = "devprof.d";
pub const OVERRIDE_FILE: &str = ".devprof-profile";

/// Project path types
#[derive(Debug, Clone, Copy)]
pub enum ProjectPath {
    /// Project root: nearest ancestor holding devprof.toml
    Root,
    /// Registry manifest: root/devprof.toml
    Manifest,
    /// Registry fragments: root/devprof.d
    Fragments,
    /// Local, git-ignored profile override: root/.devprof-profile
    OverrideFile,
    /// root/.gitignore
    Gitignore,
    /// Package prefixes: config prefix_root or $XDG_STATE_HOME/devprof/packages
    Prefixes,
    /// User settings: $XDG_CONFIG_HOME/devprof/config.toml
    UserConfig,
}

/// What `init` changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitReport {
    pub manifest_created: bool,
    pub gitignore_updated: bool,
}

/// A directory tree whose environment is described by a devprof registry.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    state_dir: PathBuf,
    config_file: PathBuf,
    config: Config,
}

impl Project {
    /// Locate the project containing `start`, loading user settings from XDG dirs.
    pub fn discover(start: &Path) -> Result<Self> {
        let start = start
            .canonicalize()
            .with_context(|| format!("Failed to resolve project directory {:?}", start))?;

        let root = start
            .ancestors()
            .find(|dir| dir.join(MANIFEST_FILE).is_file())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| start.clone());
        debug!(root = %root.display(), "project root");

        let config_file = xdg::config_dir()?.join("config.toml");
        let config = Config::load(&config_file)?;
        Ok(Self::new(root, xdg::state_dir()?, config_file, config))
    }

    pub fn new(root: PathBuf, state_dir: PathBuf, config_file: PathBuf, config: Config) -> Self {
        Self {
            root,
            state_dir,
            config_file,
            config,
        }
    }

    /// Get path for a specific project location
    pub fn path(&self, path_type: ProjectPath) -> Result<PathBuf> {
        Ok(match path_type {
            ProjectPath::Root => self.root.clone(),
            ProjectPath::Manifest => self.root.join(MANIFEST_FILE),
            ProjectPath::Fragments => self.root.join(FRAGMENTS_DIR),
            ProjectPath::OverrideFile => self.root.join(OVERRIDE_FILE),
            ProjectPath::Gitignore => self.root.join(".gitignore"),
            ProjectPath::Prefixes => match self.config.prefix_root()? {
                Some(root) => root,
                None => self.state_dir.join("packages"),
            },
            ProjectPath::UserConfig => self.config_file.clone(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn has_manifest(&self) -> bool {
        self.root.join(MANIFEST_FILE).is_file()
    }

    pub fn manifests(&self) -> Result<ManifestSet> {
        ManifestSet::load(
            &self.path(ProjectPath::Manifest)?,
            &self.path(ProjectPath::Fragments)?,
        )
    }

    pub fn registry(&self) -> Result<Registry> {
        self.manifests()?.into_registry()
    }

    pub fn override_reader(&self) -> Result<OverrideReader> {
        Ok(OverrideReader::new(
            self.path(ProjectPath::OverrideFile)?,
            self.config.env_var.clone(),
        ))
    }

    pub fn materializer(&self) -> Result<Materializer<CommandProbe>> {
        Ok(Materializer::new(
            self.path(ProjectPath::Prefixes)?,
            CommandProbe::new(self.config.probe_timeout()),
        ))
    }

    /// Select, resolve and materialize the active profile.
    pub fn activate(&self, registry: &Registry) -> Result<Activation> {
        let requested = self.override_reader()?.read();
        let materializer = self.materializer()?;

        let mut pipeline = Pipeline::new();
        let activation = pipeline
            .run(
                registry,
                requested.as_ref(),
                registry.default_profile(),
                &materializer,
            )
            .map_err(anyhow::Error::new)
            .with_context(|| format!("Failed to activate project at {:?}", self.root))?;
        Ok(activation)
    }

    /// Write the template manifest and ignore the override file.
    pub fn init(&self) -> Result<InitReport> {
        let manifest = self.path(ProjectPath::Manifest)?;
        let manifest_created = if manifest.exists() {
            false
        } else {
            fs::create_dir_all(&self.root)
                .with_context(|| format!("Failed to create project directory {:?}", self.root))?;
            fs::write(&manifest, BUILTIN_MANIFEST)
                .with_context(|| format!("Failed to write manifest {:?}", manifest))?;
            true
        };

        let gitignore_updated =
            Self::add_ignore_entry(&self.path(ProjectPath::Gitignore)?, OVERRIDE_FILE)?;

        Ok(InitReport {
            manifest_created,
            gitignore_updated,
        })
    }

    /// Append `entry` to a gitignore file unless already listed (idempotent).
    fn add_ignore_entry(gitignore: &Path, entry: &str) -> Result<bool> {
        let existing = if gitignore.exists() {
            fs::read_to_string(gitignore)
                .with_context(|| format!("Failed to read {:?}", gitignore))?
        } else {
            String::new()
        };

        let listed = existing.lines().any(|line| {
            let line = line.trim();
            line == entry || line.strip_prefix('/') == Some(entry)
        });
        if listed {
            return Ok(false);
        }

        let new_content = if existing.is_empty() {
            format!("# devprof local profile override\n{}\n", entry)
        } else if existing.ends_with('\n') {
            format!("{}# devprof local profile override\n{}\n", existing, entry)
        } else {
            format!("{}\n# devprof local profile override\n{}\n", existing, entry)
        };

        fs::write(gitignore, new_content)
            .with_context(|| format!("Failed to write {:?}", gitignore))?;
        Ok(true)
    }

    /// Pin `name` for this checkout via the override file.
    pub fn use_profile(&self, registry: &Registry, name: &str) -> Result<()> {
        registry.lookup(name)?;
        let path = self.path(ProjectPath::OverrideFile)?;
        fs::write(&path, format!("{name}\n"))
            .with_context(|| format!("Failed to write override file {:?}", path))?;
        Ok(())
    }

    /// Remove the override file. Returns whether one existed.
    pub fn clear_override(&self) -> Result<bool> {
        let path = self.path(ProjectPath::OverrideFile)?;
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)
            .with_context(|| format!("Failed to remove override file {:?}", path))?;
        Ok(true)
    }

    /// Whether git ignores the override file; `None` outside a git work tree.
    pub fn override_is_ignored(&self) -> Result<Option<bool>> {
        let repo = match git2::Repository::discover(&self.root) {
            Ok(repo) => repo,
            Err(_) => return Ok(None),
        };
        let Some(workdir) = repo.workdir() else {
            return Ok(None);
        };

        let workdir = workdir
            .canonicalize()
            .with_context(|| format!("Failed to resolve git work tree {:?}", workdir))?;
        let root = self.root.canonicalize().unwrap_or_else(|_| self.root.clone());
        let relative = root
            .join(OVERRIDE_FILE)
            .strip_prefix(&workdir)
            .map(Path::to_path_buf)
            .with_context(|| format!("Project {:?} is outside git work tree {:?}", root, workdir))?;

        let ignored = repo
            .is_path_ignored(&relative)
            .context("Failed to query git ignore rules")?;
        Ok(Some(ignored))
    }
}

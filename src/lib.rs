// Public API
pub mod cli;
pub mod commands;

// Core domain types
pub mod activation;
pub mod config;
pub mod environment;
pub mod error;
pub mod manifest;
pub mod materialize;
pub mod overlay;
pub mod probe;
pub mod profile;
pub mod project;
pub mod registry;
pub mod resolver;
pub mod selector;
mod ui;
mod util;

// Re-export main types
pub use activation::{Activation, Pipeline, SelectionState};
pub use config::Config;
pub use environment::{Environment, Shell};
pub use error::ProfileError;
pub use manifest::{ManifestSet, RegistryFile, RegistrySource};
pub use materialize::{ActivationResult, Materializer};
pub use overlay::Overlay;
pub use probe::{CommandProbe, VersionProbe};
pub use profile::{Capability, CapabilitySet, PackageSpec, Profile};
pub use project::{Project, ProjectPath};
pub use registry::Registry;
pub use resolver::{ResolvedEnvironment, ResolvedPackage, Resolver};
pub use selector::{select, OverrideReader, ProfileOverride, Selection, UnknownProfileWarning};

use crate::error::ProfileError;
use crate::materialize::{ActivationResult, Materializer};
use crate::probe::VersionProbe;
use crate::registry::Registry;
use crate::resolver::{ResolvedEnvironment, Resolver};
use crate::selector::{select, ProfileOverride, Selection};

/// A successful activation: selection, resolution and materialized descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub selection: Selection,
    pub resolved: ResolvedEnvironment,
    pub result: ActivationResult,
}

/// Where an activation pipeline currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    Unselected,
    Resolving {
        profile: Option<String>,
    },
    Active(Box<Activation>),
    Failed {
        profile: Option<String>,
        error: ProfileError,
    },
}

impl SelectionState {
    pub fn is_active(&self) -> bool {
        matches!(self, SelectionState::Active(_))
    }

    pub fn activation(&self) -> Option<&Activation> {
        match self {
            SelectionState::Active(activation) => Some(activation),
            _ => None,
        }
    }
}

/// Linear select → resolve → materialize pipeline for one activation.
///
/// Build a fresh pipeline per activation; nothing is shared between runs.
#[derive(Debug, Default)]
pub struct Pipeline {
    state: SelectionState,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn into_state(self) -> SelectionState {
        self.state
    }

    /// Run the pipeline. On error the state is `Failed` and no environment is produced.
    pub fn run<P: VersionProbe>(
        &mut self,
        registry: &Registry,
        requested: Option<&ProfileOverride>,
        default_name: &str,
        materializer: &Materializer<P>,
    ) -> Result<Activation, ProfileError> {
        self.state = SelectionState::Resolving { profile: None };

        let selection = match select(registry, requested, default_name) {
            Ok(selection) => selection,
            Err(error) => return Err(self.fail(None, error)),
        };
        self.state = SelectionState::Resolving {
            profile: Some(selection.name.clone()),
        };

        let resolved = match Resolver::new(registry).resolve_name(&selection.name) {
            Ok(resolved) => resolved,
            Err(error) => return Err(self.fail(Some(selection.name), error)),
        };

        let result = materializer.materialize(&resolved);
        let activation = Activation {
            selection,
            resolved,
            result,
        };
        self.state = SelectionState::Active(Box::new(activation.clone()));
        Ok(activation)
    }

    fn fail(&mut self, profile: Option<String>, error: ProfileError) -> ProfileError {
        self.state = SelectionState::Failed {
            profile,
            error: error.clone(),
        };
        error
    }
}

use thiserror::Error;

/// Structural failures raised while registering, selecting or resolving profiles.
///
/// Every variant aborts activation. Unknown override names are not errors;
/// see [`crate::selector::UnknownProfileWarning`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("profile '{0}' is already registered")]
    DuplicateProfile(String),

    #[error("package '{0}' is already registered")]
    DuplicatePackage(String),

    #[error("overlay '{0}' is already registered")]
    DuplicateOverlay(String),

    #[error("unknown profile '{0}'")]
    UnknownProfile(String),

    #[error("profile '{profile}' references unknown overlay '{overlay}'")]
    UnknownOverlay { profile: String, overlay: String },

    #[error("invalid {kind} name '{name}' (expected lowercase letters, digits, '.', '_' or '-')")]
    InvalidName { kind: &'static str, name: String },

    #[error("profile include cycle: {}", .0.join(" -> "))]
    IncludeCycle(Vec<String>),

    #[error(
        "overlays '{first}' and '{second}' conflict on '{package}' ({key}) in profile '{profile}'"
    )]
    OverlayConflict {
        profile: String,
        package: String,
        first: String,
        second: String,
        key: String,
    },

    #[error("default profile '{0}' is not registered")]
    InvalidDefault(String),
}

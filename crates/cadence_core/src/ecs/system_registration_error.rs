use thiserror::Error;

/// Errors that can occur while registering a system with the world.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SystemRegistrationError {
    #[error("system '{name}' is already registered")]
    DuplicateName { name: String },

    #[error("system '{name}' depends on itself")]
    SelfDependency { name: String },

    #[error("system '{system}' depends on '{dependency}', which is not registered")]
    UnresolvedDependency { system: String, dependency: String },
}

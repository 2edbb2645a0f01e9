use std::sync::Arc;

use thiserror::Error;

use crate::types::DynError;

/// Errors of the definition registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A definition with this identifier is already registered
    #[error("'{0}' has been registered twice")]
    DuplicateIdentifier(String),
    /// No definition with this identifier is registered
    #[error("'{0}' is not registered")]
    UnknownIdentifier(String),
    /// The metadata does not fit the provider constructing the module
    #[error("Definition '{identifier}' is invalid: {reason}")]
    InvalidDefinition { identifier: String, reason: String },
}

/// Errors while turning artifacts into definitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// Conflicting directives, or several convention candidates for one binding
    #[error("Binding '{binding}' of '{artifact}' is ambiguous: {reason}")]
    AmbiguousBinding {
        artifact: String,
        binding: String,
        reason: String,
    },
    /// The artifact carries a binding the scanner does not understand - the artifact is skipped
    #[error("'{artifact}' has an unsupported binding: {reason}")]
    UnsupportedBinding { artifact: String, reason: String },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Errors while ordering the definitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("'{required_by}' needs '{identifier}' but it is missing")]
    UnresolvedReference {
        identifier: String,
        required_by: String,
    },
    #[error("A circular dependency exists: {}", cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },
    /// A singleton can not hold on to a per-request definition
    #[error("Singleton '{required_by}' depends on request scoped '{identifier}'")]
    ScopeMismatch {
        identifier: String,
        required_by: String,
    },
}

/// Errors while initiating the instances
#[derive(Error, Debug, Clone)]
pub enum InitError {
    /// The dependency graph could not be resolved
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// Construction or initialization of a definition failed
    #[error("Initialization of '{identifier}' failed - error: {cause}")]
    InitializationFailed {
        identifier: String,
        cause: Arc<DynError>,
    },
    /// Initiation timed out
    #[error("Initiation timed out")]
    Timeout,
}

/// Errors when trying to get an instance from the container
#[derive(Error, Debug, Clone)]
pub enum ContainerError {
    /// The container has not (successfully) completed `ready()`
    #[error("The container is not ready yet")]
    NotReadyYet,
    #[error("'{0}' is not registered")]
    UnknownIdentifier(String),
    /// Per-request definitions are never instantiated by the container
    #[error("'{0}' is request scoped and has to be constructed by its consumer")]
    RequestScoped(String),
    #[error("Failed to downcast '{identifier}', required: '{required_type}' actual: '{actual_type}'")]
    DowncastFailed {
        identifier: String,
        required_type: &'static str,
        actual_type: &'static str,
    },
    #[error(transparent)]
    Init(#[from] InitError),
    /// The container has been closed
    #[error("The container has been closed")]
    Closed,
    /// One or more teardown hooks failed - all hooks were still invoked
    #[error("{}", display_teardown(.0))]
    TeardownFailed(Vec<(String, Arc<DynError>)>),
}

fn display_teardown(failures: &[(String, Arc<DynError>)]) -> String {
    let mut display = Vec::new();
    display.push("One or more teardown hooks failed:".to_string());
    for (identifier, error) in failures {
        display.push(format!("- '{identifier}': {error}"));
    }
    display.join("\n")
}

/// Errors when placing resolved values into a module
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InjectError {
    #[error("Nothing was injected at position {0}")]
    MissingArgument(usize),
    #[error("The module has no property '{0}'")]
    UnknownProperty(String),
    #[error("Expected an instance but a value was injected")]
    NotAnInstance,
    #[error("Expected a value but an instance was injected")]
    NotAValue,
    #[error("Failed to downcast, required: '{required_type}' actual: '{actual_type}'")]
    DowncastFailed {
        required_type: &'static str,
        actual_type: &'static str,
    },
    #[error("Failed to deserialize '{required_type}': {message}")]
    Deserialize {
        required_type: &'static str,
        message: String,
    },
    /// The plugin registry has no entry for the identifier
    #[error("Plugin '{0}' is not registered")]
    PluginMissing(String),
    /// A referenced instance is not available
    #[error("Instance '{0}' is not available")]
    Unavailable(String),
}

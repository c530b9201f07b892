use crate::instance_provider::ErrorPtr;
use thiserror::Error;

/// Errors raised while describing objects with the fluent builder.
#[derive(Error, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum ObjectDefinitionError {
    #[error("The property selector '{property}' does not point to a valid property of {type_name}")]
    InvalidPropertySelector {
        type_name: String,
        property: String,
    },
}

/// Error related to object definition registries.
#[derive(Error, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum ObjectDefinitionRegistryError {
    #[error("Attempted to register a duplicated object with name: {0}")]
    DuplicateObjectName(String),
    #[error("No object definition named: {0}")]
    NoSuchDefinition(String),
    #[error("Parent definition '{parent}' of object '{name}' is not registered")]
    MissingParentDefinition { name: String, parent: String },
    #[error("Object definition '{0}' is its own ancestor")]
    ParentCycle(String),
}

/// Reasons for failing to find exactly one object for a given dependency.
#[derive(Error, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum UnsatisfiedDependencyError {
    #[error("No object definition for type {0}")]
    NoCandidate(String),
    #[error("More than one object definition for type {type_name}: {}", names.join(", "))]
    MultipleCandidates {
        type_name: String,
        names: Vec<String>,
    },
    #[error("Property '{property}' of object '{object}' has not been set")]
    UnsetProperty { object: String, property: String },
}

/// Errors related to setting a single property on an object.
#[derive(Error, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum PropertyError {
    #[error("Unknown property: {0}")]
    UnknownProperty(String),
    #[error("Cannot convert {found} to {expected}")]
    Conversion { expected: String, found: String },
}

/// Errors related to consuming constructor arguments.
#[derive(Error, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum ConstructorArgumentError {
    #[error("Missing constructor argument at index {0}")]
    Missing(usize),
    #[error("Invalid constructor argument at index {index}: {source}")]
    Conversion {
        index: usize,
        #[source]
        source: PropertyError,
    },
    #[error("{0} constructor argument(s) were not used")]
    Unused(usize),
}

/// Errors related to creating and managing objects.
#[derive(Error, Clone, Debug)]
pub enum ObjectInstanceProviderError {
    #[error("Cannot find named object: {0}")]
    NoNamedInstance(String),
    #[error("Unsatisfied dependency: {0}")]
    UnsatisfiedDependency(#[from] UnsatisfiedDependencyError),
    #[error("Object '{name}' is not compatible with type {type_name}")]
    IncompatibleObject { name: String, type_name: String },
    #[error("Detected a dependency cycle: {0}")]
    DependencyCycle(String),
    #[error("Cannot instantiate abstract object definition: {0}")]
    AbstractObject(String),
    #[error("Unrecognized scope '{scope}' of object: {name}")]
    UnrecognizedScope { name: String, scope: String },
    #[error("Error setting property '{property}' of object '{object}': {source}")]
    Property {
        object: String,
        property: String,
        #[source]
        source: PropertyError,
    },
    #[error("Error constructing object '{object}': {source}")]
    ConstructorArguments {
        object: String,
        #[source]
        source: ConstructorArgumentError,
    },
    #[error("Error creating object '{object}': {source}")]
    Creation { object: String, source: ErrorPtr },
    #[error("Error post-processing object '{object}': {source}")]
    PostProcessing { object: String, source: ErrorPtr },
    #[error("Error in lifecycle callback of object '{object}': {source}")]
    Lifecycle { object: String, source: ErrorPtr },
    #[error("Invalid object definition: {0}")]
    Definition(#[from] ObjectDefinitionRegistryError),
    #[error("Application context '{0}' is not active - call refresh() first")]
    ContextNotActive(String),
}

/// Errors related to placeholder substitution.
#[derive(Error, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum PlaceholderError {
    #[error("Could not resolve placeholder '{placeholder}' in object '{object}'")]
    Unresolvable { object: String, placeholder: String },
    #[error("Circular placeholder reference '{placeholder}' in object '{object}'")]
    Circular { object: String, placeholder: String },
}

/// Errors raised while refreshing or closing an application context.
#[derive(Error, Clone, Debug)]
pub enum ContextError {
    #[error(transparent)]
    Registry(#[from] ObjectDefinitionRegistryError),
    #[error(transparent)]
    Instance(#[from] ObjectInstanceProviderError),
    #[error(transparent)]
    Placeholder(#[from] PlaceholderError),
    #[error("Object factory post-processor failed: {0}")]
    FactoryPostProcessor(ErrorPtr),
}

// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for topology declaration and realization

use thiserror::Error;

use crate::state_machine::TransitionError;

/// Errors raised while declaring or resolving a topology
///
/// Every variant names the logical resource(s) at fault. All of them are
/// reported before anything is handed to a provisioning engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopologyError {
    /// Malformed or missing declared value
    #[error("Configuration error in '{resource}': {reason}")]
    Config { resource: String, reason: String },

    /// Reference to an entity that is not declared or lacks a required flag
    #[error("Dependency error in '{resource}': {reason}")]
    Dependency { resource: String, reason: String },

    /// The reference graph is not acyclic
    #[error("Dependency cycle detected among: {}", .resources.join(", "))]
    Cycle { resources: Vec<String> },
}

impl TopologyError {
    /// Build a configuration error for a resource
    pub fn config(resource: impl Into<String>, reason: impl ToString) -> Self {
        Self::Config {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a dependency error for a resource
    pub fn dependency(resource: impl Into<String>, reason: impl ToString) -> Self {
        Self::Dependency {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }

    /// Logical name of the offending resource (first one for cycles)
    pub fn resource(&self) -> Option<&str> {
        match self {
            Self::Config { resource, .. } | Self::Dependency { resource, .. } => Some(resource),
            Self::Cycle { resources } => resources.first().map(String::as_str),
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    pub fn is_dependency(&self) -> bool {
        matches!(self, Self::Dependency { .. })
    }

    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::Cycle { .. })
    }
}

/// Result type for topology operations
pub type TopologyResult<T> = Result<T, TopologyError>;

/// Errors raised by a provisioning engine or while publishing stack outputs
#[derive(Debug, Error)]
pub enum EngineError {
    /// A resource was scheduled before one of its dependencies was realized
    #[error("Resource '{resource}' scheduled before dependency '{dependency}' was realized")]
    DependencyNotRealized { resource: String, dependency: String },

    /// The plan lists a resource ahead of one of its dependencies
    #[error("Plan lists '{resource}' before its dependency '{dependency}'")]
    OrderViolation { resource: String, dependency: String },

    /// A property references a resource that is not part of realized state
    #[error("Resource '{resource}' references unknown resource '{reference}'")]
    UnresolvedReference { resource: String, reference: String },

    /// A realized resource does not expose the requested attribute
    #[error("Resource '{resource}' has no attribute '{attribute}'")]
    MissingAttribute { resource: String, attribute: String },

    /// No free address left in a subnet or public pool
    #[error("Address pool '{pool}' is exhausted")]
    AddressExhausted { pool: String },

    /// No output with this name was exported
    #[error("Unknown stack output: {0}")]
    UnknownOutput(String),

    /// The output will never be populated (stack dropped)
    #[error("Stack output '{0}' is no longer available")]
    OutputUnavailable(String),

    /// Realization lifecycle violation
    #[error("Lifecycle error for '{resource}': {source}")]
    Lifecycle {
        resource: String,
        #[source]
        source: TransitionError,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// State file I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

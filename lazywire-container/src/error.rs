//! Error types for container operations.
//!
//! Configuration problems are gathered into [`ConfigErrors`] so that one
//! `resolve()` call reports every mistake at once. Cycles, missing
//! dependencies and factory failures each get a dedicated payload with
//! enough context to fix the registration.

use std::fmt;
use std::sync::Arc;

use lazywire_support::rendering::render_chain;

use crate::key::DependencyKey;

/// Boxed error accepted from fallible factories.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared form of a factory error, kept so a failure can be reported again.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Main error type for all container operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InjectorError {
    /// `resolve()` was called on a container that is already resolved.
    #[error("Injector already resolved")]
    AlreadyResolved,

    /// A request was made before `resolve()` succeeded.
    #[error("Injector not resolved. Call .resolve() before requesting dependencies")]
    NotResolved,

    /// The container was torn down by `clean()`.
    #[error("Injector already cleaned")]
    AlreadyCleaned,

    /// One or more registrations are invalid.
    #[error("{}", .0)]
    Configuration(ConfigErrors),

    /// The provider graph contains a cycle.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),

    /// No value, factory or binding provides the requested type.
    #[error("{}", .0)]
    NotRegistered(NotRegisteredError),

    /// A factory returned an error, now or on its single earlier attempt.
    #[error("Failed to construct {key}: {source}")]
    ConstructionFailed {
        key: DependencyKey,
        #[source]
        source: SharedError,
    },

    /// A stored instance does not have the type it is registered under.
    #[error("Type mismatch: stored instance is not a {expected}")]
    TypeMismatch { expected: &'static str },
}

/// A single invalid registration found during `resolve()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A value or interface value for an already provided type.
    DuplicateValue { key: DependencyKey },
    /// A factory whose output type is already provided.
    DuplicateFactory { key: DependencyKey },
    /// A second binding for the same interface.
    DuplicateBinding {
        interface: DependencyKey,
        existing: DependencyKey,
        rejected: DependencyKey,
    },
    /// A binding or interface value whose concrete type is not a declared
    /// implementor of the interface.
    NotImplemented {
        interface: DependencyKey,
        concrete: DependencyKey,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateValue { key } => {
                write!(f, "provider for type {key} already exists")
            }
            Self::DuplicateFactory { key } => {
                write!(f, "provider already registered for type {key}")
            }
            Self::DuplicateBinding {
                interface,
                existing,
                rejected,
            } => write!(
                f,
                "binding for {interface} is already defined to {existing}, cannot bind it to {rejected}"
            ),
            Self::NotImplemented {
                interface,
                concrete,
            } => write!(
                f,
                "type {concrete} does not implement interface {interface} \
                 (list it in interface!({} = [...]))",
                interface.short_name()
            ),
        }
    }
}

/// Every configuration error found by one `resolve()` pass, in the order
/// they were detected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigErrors(Vec<ConfigError>);

impl ConfigErrors {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ConfigError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConfigError> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a ConfigErrors {
    type Item = &'a ConfigError;
    type IntoIter = std::slice::Iter<'a, ConfigError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for ConfigErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid provider configuration ({} errors):", self.0.len())?;
        for error in &self.0 {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

/// Error when a dependency has no provider.
#[derive(Debug, Clone)]
pub struct NotRegisteredError {
    /// The type that was requested.
    pub requested: DependencyKey,
    /// The provider whose input asked for it, if any.
    pub required_by: Option<DependencyKey>,
    /// Registered types with similar names.
    pub suggestions: Vec<String>,
}

impl fmt::Display for NotRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "No provider found for type {}", self.requested)?;

        if let Some(ref parent) = self.required_by {
            write!(f, "\n  Required by: {parent}")?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        write!(
            f,
            "\n  Hint: register a value, a factory or a binding for {}",
            self.requested.short_name()
        )
    }
}

/// Error when a circular dependency is detected.
#[derive(Debug, Clone)]
pub struct CircularDependencyError {
    /// The cycle, starting and ending with the same type.
    /// Example: `[A, B, C, A]`
    pub chain: Vec<DependencyKey>,
}

impl CircularDependencyError {
    /// Returns `true` if `key` takes part in the cycle.
    pub fn contains(&self, key: &DependencyKey) -> bool {
        self.chain.contains(key)
    }
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.chain.iter().map(|k| k.short_name()).collect();
        write!(f, "Dependency cycle detected:\n  {}", render_chain(&names))?;
        write!(
            f,
            "\n  Hint: break the cycle by resolving one side lazily through the Container"
        )
    }
}

/// Convenient Result type for container operations.
pub type Result<T> = std::result::Result<T, InjectorError>;

//! Variable resolution across generators and scopes.
//!
//! Lookup order for a placeholder name:
//!
//! 1. dynamic generators (`$timestamp`, ...), evaluated on every call
//! 2. the environment store
//! 3. the variables scope, then any extra scopes in the order they were added
//!
//! The first source that knows the name wins. A name nobody knows is an
//! error; whether that error fails the request or leaves the placeholder in
//! place is decided once, by the template engine's `UnresolvedPolicy`.

use crate::generator::{Generators, is_dynamic};
use crate::scope::{Lookup, Scope, ScopeChain};
use crate::store::EnvironmentStore;
use thiserror::Error;

/// Scope name used for the environment store.
pub const ENVIRONMENT_SCOPE: &str = "environment";

/// Errors from resolving a single name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The name is not defined in any scope.
    #[error("'{name}' is not defined in any scope ({scopes})")]
    Undefined {
        /// The name that failed to resolve
        name: String,
        /// Scopes consulted, comma-separated
        scopes: String,
    },

    /// The name uses `$` syntax but no such generator exists.
    #[error("unknown dynamic variable '{name}'")]
    UnknownGenerator {
        /// The name that failed to resolve
        name: String,
    },
}

impl ResolveError {
    /// The name that failed.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Undefined { name, .. } | Self::UnknownGenerator { name } => name,
        }
    }
}

/// Resolves placeholder names for one substitution context.
#[derive(Debug)]
pub struct Resolver<'a> {
    generators: &'a Generators,
    scopes: ScopeChain<'a>,
}

impl<'a> Resolver<'a> {
    /// Standard resolver: generators, then `environment`, then `variables`.
    #[must_use]
    pub fn new(
        generators: &'a Generators,
        environment: &'a EnvironmentStore,
        variables: &'a Scope,
    ) -> Self {
        Self {
            generators,
            scopes: ScopeChain::new()
                .then(ENVIRONMENT_SCOPE, environment)
                .then(variables.name(), variables),
        }
    }

    /// Append a lower-priority scope.
    #[must_use]
    pub fn with_scope(mut self, name: &'a str, scope: &'a dyn Lookup) -> Self {
        self.scopes = self.scopes.then(name, scope);
        self
    }

    /// Resolve `name` to a string.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnknownGenerator`] for an unknown `$` name and
    /// [`ResolveError::Undefined`] when no scope defines `name`.
    pub fn resolve(&self, name: &str) -> Result<String, ResolveError> {
        if let Some(value) = self.generators.generate(name) {
            return Ok(value);
        }

        if let Some((scope, value)) = self.scopes.lookup(name) {
            tracing::trace!(name, scope, "resolved placeholder");
            return Ok(value.to_string());
        }

        if is_dynamic(name) {
            return Err(ResolveError::UnknownGenerator {
                name: name.to_string(),
            });
        }

        Err(ResolveError::Undefined {
            name: name.to_string(),
            scopes: self.scopes.names().collect::<Vec<_>>().join(", "),
        })
    }

    /// Whether `name` would resolve, without evaluating generators.
    #[must_use]
    pub fn is_defined(&self, name: &str) -> bool {
        self.generators.contains(name) || self.scopes.lookup(name).is_some()
    }
}

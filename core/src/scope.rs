//! Variable scopes and priority-ordered lookup.

use crate::store::EnvironmentStore;
use std::collections::HashMap;

/// Anything that can answer a `key → value` lookup.
pub trait Lookup {
    /// Look up `key`, returning `None` when absent.
    fn lookup(&self, key: &str) -> Option<&str>;
}

impl Lookup for EnvironmentStore {
    fn lookup(&self, key: &str) -> Option<&str> {
        self.get(key)
    }
}

/// A named set of variables, e.g. suite-level `variables`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    name: String,
    values: HashMap<String, String>,
}

impl Scope {
    /// Create an empty scope.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: HashMap::new(),
        }
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Scope name, used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Write a value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Whether `key` is defined in this scope.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

impl Lookup for Scope {
    fn lookup(&self, key: &str) -> Option<&str> {
        self.get(key)
    }
}

/// Ordered list of named lookups. The first scope holding a key wins.
#[derive(Default)]
pub struct ScopeChain<'a> {
    scopes: Vec<(&'a str, &'a dyn Lookup)>,
}

impl<'a> ScopeChain<'a> {
    /// Create an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self { scopes: Vec::new() }
    }

    /// Append a scope with lower priority than every scope already present.
    #[must_use]
    pub fn then(mut self, name: &'a str, scope: &'a dyn Lookup) -> Self {
        self.scopes.push((name, scope));
        self
    }

    /// Look up `key`, returning the value and the name of the scope that held it.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<(&'a str, &'a str)> {
        self.scopes
            .iter()
            .find_map(|(name, scope)| scope.lookup(key).map(|value| (*name, value)))
    }

    /// Scope names in priority order.
    pub fn names(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.scopes.iter().map(|(name, _)| *name)
    }
}

impl std::fmt::Debug for ScopeChain<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_match_wins() {
        let mut store = EnvironmentStore::new();
        store.set("last_ticket_type_id", "from-env");
        let variables = Scope::new("variables")
            .with("last_ticket_type_id", "from-vars")
            .with("only_in_vars", "v");

        let chain = ScopeChain::new()
            .then("environment", &store)
            .then(variables.name(), &variables);

        assert_eq!(
            chain.lookup("last_ticket_type_id"),
            Some(("environment", "from-env"))
        );
        assert_eq!(chain.lookup("only_in_vars"), Some(("variables", "v")));
        assert_eq!(chain.lookup("nowhere"), None);
    }

    #[test]
    fn test_chain_names_in_order() {
        let store = EnvironmentStore::new();
        let variables = Scope::new("variables");
        let chain = ScopeChain::new()
            .then("environment", &store)
            .then("variables", &variables);
        assert_eq!(chain.names().collect::<Vec<_>>(), vec!["environment", "variables"]);
    }
}

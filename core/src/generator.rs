//! Dynamic generators - `$`-prefixed placeholders that produce a fresh value
//! on every evaluation.
//!
//! | Name | Value |
//! |------|-------|
//! | `$timestamp` | epoch milliseconds |
//! | `$isoTimestamp` | RFC 3339, millisecond precision |
//! | `$guid`, `$randomUUID` | random UUID v4 |
//! | `$randomInt` | integer in `0..1000` |
//!
//! Nothing is cached. Two `{{$timestamp}}` occurrences in one template call the
//! clock twice, which is what lets a single request body carry several names
//! that must not collide with earlier runs.

use crate::clock::Clock;
use chrono::SecondsFormat;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;

/// Prefix shared by every dynamic generator name.
pub const DYNAMIC_PREFIX: char = '$';

/// A generator function. Receives the table's clock.
pub type GeneratorFn = Arc<dyn Fn(&dyn Clock) -> String + Send + Sync>;

/// Table of dynamic generators sharing one clock.
#[derive(Clone)]
pub struct Generators {
    clock: Arc<dyn Clock>,
    table: HashMap<String, GeneratorFn>,
}

impl Generators {
    /// Create a table with the built-in generators.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let mut generators = Self {
            clock,
            table: HashMap::new(),
        };

        generators.register("$timestamp", |clock| {
            clock.now().timestamp_millis().to_string()
        });
        generators.register("$isoTimestamp", |clock| {
            clock.now().to_rfc3339_opts(SecondsFormat::Millis, true)
        });
        generators.register("$guid", |_| uuid::Uuid::new_v4().to_string());
        generators.register("$randomUUID", |_| uuid::Uuid::new_v4().to_string());
        generators.register("$randomInt", |_| {
            rand::thread_rng().gen_range(0..1000).to_string()
        });

        generators
    }

    /// Register (or replace) a generator.
    ///
    /// Names are stored as given; callers normally include the `$` prefix.
    pub fn register<F>(&mut self, name: impl Into<String>, generator: F)
    where
        F: Fn(&dyn Clock) -> String + Send + Sync + 'static,
    {
        self.table.insert(name.into(), Arc::new(generator));
    }

    /// Evaluate a generator, or `None` if no generator has this name.
    #[must_use]
    pub fn generate(&self, name: &str) -> Option<String> {
        self.table
            .get(name)
            .map(|generator| generator(self.clock.as_ref()))
    }

    /// Whether a generator with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// The clock generators read from.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

impl std::fmt::Debug for Generators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.table.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Generators").field("names", &names).finish()
    }
}

/// Whether `name` uses the dynamic generator syntax.
#[must_use]
pub fn is_dynamic(name: &str) -> bool {
    name.starts_with(DYNAMIC_PREFIX)
}

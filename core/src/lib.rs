//! # API Chain Core
//!
//! Shared state and templating for chained HTTP API scenarios.
//!
//! A scenario suite is a pipeline: one case creates an event and stores its id,
//! the next case reads that id to create a ticket type, and so on. This crate
//! provides the pieces that carry values between cases. It performs no I/O
//! beyond optional baseline loading and export of the store.
//!
//! ## Core Concepts
//!
//! - **Environment Store**: run-scoped `key → value` registry (`store`)
//! - **Scope**: named lookup tables consulted in priority order (`scope`)
//! - **Generators**: `$`-prefixed dynamic values such as `$timestamp` (`generator`)
//! - **Resolver**: generators → environment → variables, first match wins (`resolver`)
//! - **Template Engine**: `{{name}}` substitution with a fixed unresolved policy (`template`)
//! - **Request Templates**: typed requests rendered field by field (`request`)
//!
//! ## Example
//!
//! ```
//! use api_chain_core::clock::SystemClock;
//! use api_chain_core::generator::Generators;
//! use api_chain_core::resolver::Resolver;
//! use api_chain_core::scope::Scope;
//! use api_chain_core::store::EnvironmentStore;
//! use api_chain_core::template::TemplateEngine;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = EnvironmentStore::new();
//! store.set("last_event_id", "E1");
//!
//! let generators = Generators::new(Arc::new(SystemClock));
//! let variables = Scope::new("variables");
//! let resolver = Resolver::new(&generators, &store, &variables);
//! let engine = TemplateEngine::new(&resolver);
//!
//! let path = engine.substitute("/events/{{last_event_id}}/ticket_types")?;
//! assert_eq!(path, "/events/E1/ticket_types");
//! # Ok(())
//! # }
//! ```

pub mod generator;
pub mod request;
pub mod resolver;
pub mod scope;
pub mod store;
pub mod template;

/// Clock module - time source for dynamic generators
///
/// Generators never call `Utc::now()` directly; they ask a [`clock::Clock`],
/// so tests can pin or step time.
pub mod clock {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

// Re-export commonly used types
pub use clock::{Clock, SystemClock};
pub use generator::Generators;
pub use request::{Body, Method, PreparedRequest, RequestTemplate};
pub use resolver::{ResolveError, Resolver};
pub use scope::{Lookup, Scope, ScopeChain};
pub use store::{EnvironmentStore, StoreError};
pub use template::{Escape, Template, TemplateEngine, TemplateError, UnresolvedPolicy};

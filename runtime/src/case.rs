//! Test case units.
//!
//! A [`TestCase`] is one scenario step:
//!
//! 1. render its [`RequestTemplate`] against the environment
//! 2. send it once
//! 3. check its [`Assertion`]s against the response
//! 4. run its [`Capture`]s, writing response fields back into the environment
//!
//! Cases declare what they read and write. Reads are the request's
//! placeholders plus anything passed to [`TestCase::requires`]; writes are the
//! capture keys plus anything passed to [`TestCase::produces`]. The planner
//! orders cases from these declarations rather than from file names.
//!
//! # Example
//!
//! ```
//! use api_chain_core::RequestTemplate;
//! use api_chain_runtime::case::{Assertion, Capture, TestCase};
//!
//! let case = TestCase::new(
//!     "OrgMember - create tickets",
//!     RequestTemplate::post("/events/{{last_event_id}}/ticket_types")
//!         .bearer("{{org_member_token}}"),
//! )
//! .assert(Assertion::status(201))
//! .capture(Capture::path("last_ticket_type_id", "$.id"));
//!
//! assert!(case.reads().contains("last_event_id"));
//! assert!(case.writes().contains("last_ticket_type_id"));
//! ```

use crate::transport::CapturedResponse;
use api_chain_core::RequestTemplate;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Custom response check. `Err` carries the failure message.
pub type CheckFn = Arc<dyn Fn(&CapturedResponse) -> Result<(), String> + Send + Sync>;

/// Typed extraction. Returns `(key, value)` pairs to store, or a message.
pub type ExtractFn =
    Arc<dyn Fn(&CapturedResponse) -> Result<Vec<(String, String)>, String> + Send + Sync>;

/// Expected value in a JSON assertion.
#[derive(Debug, Clone, PartialEq)]
pub enum Expected {
    /// A literal JSON value.
    Literal(Value),
    /// A variable, resolved when the assertion runs.
    Variable(String),
}

/// A check against the captured response.
#[derive(Clone)]
pub enum Assertion {
    /// Status equals.
    Status(u16),
    /// Status is one of.
    StatusIn(Vec<u16>),
    /// Value at a JSONPath equals the expected value.
    JsonEquals {
        /// JSONPath expression
        path: String,
        /// Expected value
        expected: Expected,
    },
    /// Something exists at a JSONPath.
    JsonExists {
        /// JSONPath expression
        path: String,
    },
    /// Arbitrary check.
    Custom {
        /// Shown in reports
        description: String,
        /// The check
        check: CheckFn,
    },
}

impl Assertion {
    /// `Status(code)`.
    #[must_use]
    pub const fn status(code: u16) -> Self {
        Self::Status(code)
    }

    /// JSONPath equals a literal.
    #[must_use]
    pub fn json_eq(path: impl Into<String>, expected: impl Into<Value>) -> Self {
        Self::JsonEquals {
            path: path.into(),
            expected: Expected::Literal(expected.into()),
        }
    }

    /// JSONPath equals the current value of a variable.
    #[must_use]
    pub fn json_eq_var(path: impl Into<String>, variable: impl Into<String>) -> Self {
        Self::JsonEquals {
            path: path.into(),
            expected: Expected::Variable(variable.into()),
        }
    }

    /// Something exists at a JSONPath.
    #[must_use]
    pub fn json_exists(path: impl Into<String>) -> Self {
        Self::JsonExists { path: path.into() }
    }

    /// Custom check.
    #[must_use]
    pub fn custom<F>(description: impl Into<String>, check: F) -> Self
    where
        F: Fn(&CapturedResponse) -> Result<(), String> + Send + Sync + 'static,
    {
        Self::Custom {
            description: description.into(),
            check: Arc::new(check),
        }
    }

    /// Human-readable description for reports.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Status(code) => format!("status should be {code}"),
            Self::StatusIn(codes) => format!("status should be one of {codes:?}"),
            Self::JsonEquals { path, expected } => match expected {
                Expected::Literal(value) => format!("{path} should equal {value}"),
                Expected::Variable(name) => format!("{path} should equal {{{{{name}}}}}"),
            },
            Self::JsonExists { path } => format!("{path} should exist"),
            Self::Custom { description, .. } => description.clone(),
        }
    }

    /// Variable names this assertion reads.
    fn reads(&self) -> Option<&str> {
        match self {
            Self::JsonEquals {
                expected: Expected::Variable(name),
                ..
            } => Some(name),
            _ => None,
        }
    }
}

impl fmt::Debug for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Assertion({})", self.describe())
    }
}

/// Writes a response value into the environment during teardown.
#[derive(Clone)]
pub enum Capture {
    /// Store the first JSONPath match under `key`.
    Path {
        /// Environment key
        key: String,
        /// JSONPath expression
        path: String,
    },
    /// Typed extraction producing several keys at once.
    Extract {
        /// Shown in reports
        description: String,
        /// Keys the extraction writes
        keys: Vec<String>,
        /// The extraction
        extract: ExtractFn,
    },
}

impl Capture {
    /// Capture a JSONPath match.
    #[must_use]
    pub fn path(key: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Path {
            key: key.into(),
            path: path.into(),
        }
    }

    /// Capture with a typed extraction closure.
    #[must_use]
    pub fn extract<F>(description: impl Into<String>, keys: &[&str], extract: F) -> Self
    where
        F: Fn(&CapturedResponse) -> Result<Vec<(String, String)>, String> + Send + Sync + 'static,
    {
        Self::Extract {
            description: description.into(),
            keys: keys.iter().map(ToString::to_string).collect(),
            extract: Arc::new(extract),
        }
    }

    /// Keys this capture writes.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Self::Path { key, .. } => vec![key.as_str()],
            Self::Extract { keys, .. } => keys.iter().map(String::as_str).collect(),
        }
    }
}

impl fmt::Debug for Capture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path { key, path } => write!(f, "Capture({key} <- {path})"),
            Self::Extract {
                description, keys, ..
            } => write!(f, "Capture({keys:?} <- {description})"),
        }
    }
}

/// One scenario step.
#[derive(Debug, Clone)]
pub struct TestCase {
    name: String,
    request: RequestTemplate,
    requires: BTreeSet<String>,
    produces: BTreeSet<String>,
    assertions: Vec<Assertion>,
    captures: Vec<Capture>,
}

impl TestCase {
    /// New case with no assertions or captures.
    #[must_use]
    pub fn new(name: impl Into<String>, request: RequestTemplate) -> Self {
        Self {
            name: name.into(),
            request,
            requires: BTreeSet::new(),
            produces: BTreeSet::new(),
            assertions: Vec::new(),
            captures: Vec::new(),
        }
    }

    /// Declare an extra key this case reads.
    #[must_use]
    pub fn requires(mut self, key: impl Into<String>) -> Self {
        self.requires.insert(key.into());
        self
    }

    /// Declare an extra key this case must leave in the environment.
    #[must_use]
    pub fn produces(mut self, key: impl Into<String>) -> Self {
        self.produces.insert(key.into());
        self
    }

    /// Add an assertion.
    #[must_use]
    pub fn assert(mut self, assertion: Assertion) -> Self {
        self.assertions.push(assertion);
        self
    }

    /// Add a capture.
    #[must_use]
    pub fn capture(mut self, capture: Capture) -> Self {
        self.captures.push(capture);
        self
    }

    /// Case name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Request template.
    #[must_use]
    pub const fn request(&self) -> &RequestTemplate {
        &self.request
    }

    /// Assertions in declaration order.
    #[must_use]
    pub fn assertions(&self) -> &[Assertion] {
        &self.assertions
    }

    /// Captures in declaration order.
    #[must_use]
    pub fn captures(&self) -> &[Capture] {
        &self.captures
    }

    /// Keys passed to [`TestCase::produces`].
    #[must_use]
    pub const fn declared_outputs(&self) -> &BTreeSet<String> {
        &self.produces
    }

    /// Every key this case reads: declared requirements, request
    /// placeholders and variables referenced by assertions.
    #[must_use]
    pub fn reads(&self) -> BTreeSet<String> {
        let mut keys = self.requires.clone();
        keys.extend(self.request.placeholders());
        keys.extend(
            self.assertions
                .iter()
                .filter_map(Assertion::reads)
                .map(ToString::to_string),
        );
        keys
    }

    /// Every key this case writes: declared outputs and capture keys.
    #[must_use]
    pub fn writes(&self) -> BTreeSet<String> {
        let mut keys = self.produces.clone();
        for capture in &self.captures {
            keys.extend(capture.keys().into_iter().map(ToString::to_string));
        }
        keys
    }
}

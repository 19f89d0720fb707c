//! Fluent testing for single test cases
//!
//! Given an environment, when the server responds a certain way, then the
//! case report, the store and the sent request look as expected.

#![allow(clippy::module_name_repetitions)]

use crate::mock_transport::{MockTransport, json_response};
use crate::mocks::test_clock;
use api_chain_core::{Clock, EnvironmentStore, PreparedRequest, Scope, UnresolvedPolicy};
use api_chain_runtime::{CaseReport, CapturedResponse, SuiteRunner, TestCase};
use serde_json::Value;
use std::sync::Arc;

type ReportAssertion = Box<dyn FnOnce(&CaseReport)>;
type StoreAssertion = Box<dyn FnOnce(&EnvironmentStore)>;
type RequestAssertion = Box<dyn FnOnce(&PreparedRequest)>;

/// Given-When-Then helper around [`SuiteRunner::run_case`].
///
/// Uses [`test_clock`] unless another clock is given.
pub struct CaseTest {
    case: TestCase,
    store: EnvironmentStore,
    variables: Scope,
    clock: Arc<dyn Clock>,
    policy: UnresolvedPolicy,
    response: Option<CapturedResponse>,
    report_assertions: Vec<ReportAssertion>,
    store_assertions: Vec<StoreAssertion>,
    request_assertions: Vec<RequestAssertion>,
}

impl CaseTest {
    /// Test for `case`.
    #[must_use]
    pub fn new(case: TestCase) -> Self {
        Self {
            case,
            store: EnvironmentStore::new(),
            variables: Scope::new("variables"),
            clock: Arc::new(test_clock()),
            policy: UnresolvedPolicy::Fail,
            response: None,
            report_assertions: Vec::new(),
            store_assertions: Vec::new(),
            request_assertions: Vec::new(),
        }
    }

    /// Set one environment key (Given)
    #[must_use]
    pub fn given_env(mut self, key: &str, value: &str) -> Self {
        self.store.set(key, value);
        self
    }

    /// Replace the whole environment (Given)
    #[must_use]
    pub fn given_store(mut self, store: EnvironmentStore) -> Self {
        self.store = store;
        self
    }

    /// Set the variables scope (Given)
    #[must_use]
    pub fn given_variables(mut self, variables: Scope) -> Self {
        self.variables = variables;
        self
    }

    /// Use another clock for the generators
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use another unresolved-placeholder policy
    #[must_use]
    pub const fn with_policy(mut self, policy: UnresolvedPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Respond to whatever the case sends with a JSON body (When)
    #[must_use]
    pub fn when_responding(mut self, status: u16, body: Value) -> Self {
        self.response = Some(json_response(status, &body));
        self
    }

    /// Respond with a raw response (When)
    #[must_use]
    pub fn when_response(mut self, response: CapturedResponse) -> Self {
        self.response = Some(response);
        self
    }

    /// Check the case report (Then)
    #[must_use]
    pub fn then_report<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&CaseReport) + 'static,
    {
        self.report_assertions.push(Box::new(assertion));
        self
    }

    /// Check the store after teardown (Then)
    #[must_use]
    pub fn then_store<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&EnvironmentStore) + 'static,
    {
        self.store_assertions.push(Box::new(assertion));
        self
    }

    /// Check the request that was sent (Then)
    #[must_use]
    pub fn then_request<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&PreparedRequest) + 'static,
    {
        self.request_assertions.push(Box::new(assertion));
        self
    }

    /// Run the case and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if request assertions are registered but no request was sent,
    /// or if any assertion fails.
    #[allow(clippy::panic)] // Test code can panic
    pub async fn run(self) {
        let mut transport = MockTransport::new();
        if let Some(response) = self.response {
            transport = transport.with_fallback(response);
        }
        let transport = Arc::new(transport);

        let runner = SuiteRunner::new(transport.clone())
            .with_clock(self.clock)
            .with_variables(self.variables)
            .with_policy(self.policy);

        let mut store = self.store;
        let report = runner.run_case(&self.case, &mut store).await;

        for assertion in self.report_assertions {
            assertion(&report);
        }
        for assertion in self.store_assertions {
            assertion(&store);
        }
        if !self.request_assertions.is_empty() {
            let Some(request) = transport.last_request() else {
                panic!("case '{}' sent no request", self.case.name());
            };
            for assertion in self.request_assertions {
                assertion(&request);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_chain_core::RequestTemplate;
    use api_chain_runtime::{Assertion, CaseOutcome, Failure, SkipReason};
    use serde_json::json;

    #[tokio::test]
    async fn test_assertion_failure_still_captures() {
        let case = TestCase::new("create code", RequestTemplate::post("/codes"))
            .assert(Assertion::json_eq("$.max_uses", 10))
            .capture(api_chain_runtime::Capture::path("last_code_id", "$.id"));

        CaseTest::new(case)
            .when_responding(201, json!({"id": "C1", "max_uses": 9}))
            .then_report(|report| {
                assert_eq!(report.failures().len(), 1);
                assert!(matches!(report.failures()[0], Failure::Assertion { .. }));
            })
            .then_store(|store| assert_eq!(store.get("last_code_id"), Some("C1")))
            .run()
            .await;
    }

    #[tokio::test]
    async fn test_missing_dependency_skips() {
        let case = TestCase::new("ticket index", RequestTemplate::get("/tickets"))
            .requires("user_token");

        CaseTest::new(case)
            .then_report(|report| {
                assert_eq!(
                    report.outcome,
                    CaseOutcome::Skipped(SkipReason::MissingDependency {
                        key: "user_token".to_string()
                    })
                );
                assert_eq!(report.status, None);
            })
            .run()
            .await;
    }

    #[tokio::test]
    async fn test_variables_scope_and_bearer() {
        let case = TestCase::new(
            "ticket index",
            RequestTemplate::get("/tickets?query={{query}}").bearer("{{user_token}}"),
        );

        CaseTest::new(case)
            .given_env("user_token", "U1")
            .given_variables(Scope::new("variables").with("query", "vip"))
            .when_responding(200, json!({"data": []}))
            .then_report(|report| assert!(report.passed()))
            .then_request(|request| {
                assert_eq!(request.path, "/tickets?query=vip");
                assert_eq!(request.header("authorization"), Some("Bearer U1"));
            })
            .run()
            .await;
    }
}

//! Sequential suite execution.
//!
//! The runner owns the transport, the generator table and the variables
//! scope. The environment store is passed in by the caller and mutated in
//! place as captures run, so the caller can inspect or export it afterwards.
//!
//! Nothing here aborts a run. Every failure is recorded against its case and
//! execution moves on to the next one.

use crate::case::{Assertion, Capture, Expected, TestCase};
use crate::metrics::{
    CASES_TOTAL, REQUEST_DURATION_SECONDS, TRANSPORT_ERRORS_TOTAL, counter, histogram,
};
use crate::plan::{Plan, PlanError};
use crate::query::{query, render_scalar};
use crate::report::{CaseOutcome, CaseReport, Failure, SkipReason, SuiteReport};
use crate::transport::{CapturedResponse, Transport};
use api_chain_core::{
    Clock, EnvironmentStore, Generators, Resolver, Scope, SystemClock, TemplateEngine,
    UnresolvedPolicy,
};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Name of the default variables scope.
pub const VARIABLES_SCOPE: &str = "variables";

/// Runs test cases against a transport.
pub struct SuiteRunner {
    transport: Arc<dyn Transport>,
    generators: Generators,
    variables: Scope,
    policy: UnresolvedPolicy,
}

impl SuiteRunner {
    /// Runner using the system clock, an empty variables scope and
    /// `UnresolvedPolicy::Fail`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            generators: Generators::new(Arc::new(SystemClock)),
            variables: Scope::new(VARIABLES_SCOPE),
            policy: UnresolvedPolicy::Fail,
        }
    }

    /// Replace the clock behind the built-in generators.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.generators = Generators::new(clock);
        self
    }

    /// Replace the generator table.
    #[must_use]
    pub fn with_generators(mut self, generators: Generators) -> Self {
        self.generators = generators;
        self
    }

    /// Replace the variables scope.
    #[must_use]
    pub fn with_variables(mut self, variables: Scope) -> Self {
        self.variables = variables;
        self
    }

    /// Set the unresolved-placeholder policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: UnresolvedPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The variables scope.
    #[must_use]
    pub const fn variables(&self) -> &Scope {
        &self.variables
    }

    /// Plan and run `cases`, mutating `store` as captures execute.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] on duplicate case names or a dependency cycle.
    /// No request is sent in that case. Case failures, including reads that
    /// nothing satisfies, are reported, never returned.
    pub async fn run(
        &self,
        cases: &[TestCase],
        store: &mut EnvironmentStore,
    ) -> Result<SuiteReport, PlanError> {
        let plan = {
            let available =
                |key: &str| store.contains(key) || self.variables.contains(key);
            Plan::build(cases, &available)?
        };

        tracing::info!(cases = cases.len(), "Running suite");

        // key -> name of the failed case that last wrote it
        let mut failed_writers: HashMap<String, String> = HashMap::new();
        let mut report = SuiteReport::default();

        for &index in plan.order() {
            let case = &cases[index];
            let case_report = self.execute(case, store, &failed_writers).await;

            for key in case.writes() {
                if case_report.passed() {
                    failed_writers.remove(&key);
                } else {
                    failed_writers.insert(key, case.name().to_string());
                }
            }

            report.cases.push(case_report);
        }

        tracing::info!(summary = %report.summary(), "Suite finished");
        Ok(report)
    }

    /// Run a single case outside of a plan.
    pub async fn run_case(&self, case: &TestCase, store: &mut EnvironmentStore) -> CaseReport {
        self.execute(case, store, &HashMap::new()).await
    }

    #[tracing::instrument(skip_all, fields(case = case.name()))]
    async fn execute(
        &self,
        case: &TestCase,
        store: &mut EnvironmentStore,
        failed_writers: &HashMap<String, String>,
    ) -> CaseReport {
        let started = Instant::now();

        if let Some(reason) = self.skip_reason(case, store, failed_writers) {
            tracing::warn!(%reason, "Skipping case");
            return finish(case, CaseOutcome::Skipped(reason), None, started);
        }

        let request = {
            let resolver = Resolver::new(&self.generators, store, &self.variables);
            let engine = TemplateEngine::new(&resolver).with_policy(self.policy);
            match case.request().render(&engine) {
                Ok(request) => request,
                Err(err) => {
                    tracing::error!(error = %err, "Failed to render request");
                    return finish(
                        case,
                        CaseOutcome::Failed(vec![Failure::Resolution(err)]),
                        None,
                        started,
                    );
                }
            }
        };

        let url = self.transport.url_for(&request.path);
        tracing::info!(method = %request.method, %url, "Sending request");
        tracing::debug!(headers = ?request.redacted_headers(), body = ?request.body, "Request details");

        let sent = Instant::now();
        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(error = %err, %url, "Request failed");
                counter!(TRANSPORT_ERRORS_TOTAL).increment(1);
                return finish(
                    case,
                    CaseOutcome::Failed(vec![Failure::Transport(err)]),
                    None,
                    started,
                );
            }
        };
        histogram!(REQUEST_DURATION_SECONDS).record(sent.elapsed().as_secs_f64());

        tracing::info!(status = response.status, "Received response");
        tracing::debug!(body = %response.body, "Response body");

        let document = response.json().ok();
        let mut failures = Vec::new();
        {
            let resolver = Resolver::new(&self.generators, store, &self.variables);
            for assertion in case.assertions() {
                if let Err(failure) = check(assertion, &response, document.as_ref(), &resolver) {
                    tracing::warn!(%failure, "Assertion failed");
                    failures.push(failure);
                }
            }
        }

        // Teardown runs whatever the assertions said.
        for capture in case.captures() {
            if let Err(failure) = apply_capture(capture, &response, document.as_ref(), store) {
                tracing::warn!(%failure, "Capture failed");
                failures.push(failure);
            }
        }

        for key in case.declared_outputs() {
            if !store.contains(key) {
                failures.push(Failure::MissingOutput { key: key.clone() });
            }
        }

        let outcome = if failures.is_empty() {
            CaseOutcome::Passed
        } else {
            CaseOutcome::Failed(failures)
        };
        finish(case, outcome, Some(response.status), started)
    }

    fn skip_reason(
        &self,
        case: &TestCase,
        store: &EnvironmentStore,
        failed_writers: &HashMap<String, String>,
    ) -> Option<SkipReason> {
        let reads = case.reads();

        if let Some((key, writer)) = reads
            .iter()
            .find_map(|key| failed_writers.get(key).map(|writer| (key, writer)))
        {
            return Some(SkipReason::UpstreamFailed {
                key: key.clone(),
                case: writer.clone(),
            });
        }

        // Absent keys are left for the template engine to keep verbatim.
        if self.policy == UnresolvedPolicy::KeepLiteral {
            return None;
        }

        reads
            .into_iter()
            .find(|key| !store.contains(key) && !self.variables.contains(key))
            .map(|key| SkipReason::MissingDependency { key })
    }
}

impl fmt::Debug for SuiteRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteRunner")
            .field("generators", &self.generators)
            .field("variables", &self.variables)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

fn finish(
    case: &TestCase,
    outcome: CaseOutcome,
    status: Option<u16>,
    started: Instant,
) -> CaseReport {
    counter!(CASES_TOTAL, "outcome" => outcome.label()).increment(1);
    tracing::info!(outcome = outcome.label(), "Case finished");

    CaseReport {
        name: case.name().to_string(),
        outcome,
        status,
        duration: started.elapsed(),
    }
}

fn check(
    assertion: &Assertion,
    response: &CapturedResponse,
    document: Option<&Value>,
    resolver: &Resolver<'_>,
) -> Result<(), Failure> {
    let fail = |expected: String, actual: String| Failure::Assertion {
        description: assertion.describe(),
        expected,
        actual,
    };

    match assertion {
        Assertion::Status(code) => {
            if response.status == *code {
                Ok(())
            } else {
                Err(fail(code.to_string(), response.status.to_string()))
            }
        }
        Assertion::StatusIn(codes) => {
            if codes.contains(&response.status) {
                Ok(())
            } else {
                Err(fail(format!("{codes:?}"), response.status.to_string()))
            }
        }
        Assertion::JsonExists { path } => {
            let document = document.ok_or_else(|| fail("a JSON body".into(), body_excerpt(response)))?;
            match query(document, path) {
                Ok(Some(_)) => Ok(()),
                Ok(None) => Err(fail("a value".into(), "nothing".into())),
                Err(err) => Err(fail("a valid JSONPath".into(), err.to_string())),
            }
        }
        Assertion::JsonEquals { path, expected } => {
            let document = document.ok_or_else(|| fail("a JSON body".into(), body_excerpt(response)))?;
            let actual = match query(document, path) {
                Ok(actual) => actual,
                Err(err) => return Err(fail("a valid JSONPath".into(), err.to_string())),
            };

            match expected {
                Expected::Literal(want) => match actual {
                    Some(got) if got == *want => Ok(()),
                    Some(got) => Err(fail(want.to_string(), got.to_string())),
                    None => Err(fail(want.to_string(), "nothing".into())),
                },
                Expected::Variable(name) => {
                    let want = resolver
                        .resolve(name)
                        .map_err(|err| fail(format!("{{{{{name}}}}}"), err.to_string()))?;
                    match actual {
                        Some(got) if render_scalar(&got) == want => Ok(()),
                        Some(got) => Err(fail(want, render_scalar(&got))),
                        None => Err(fail(want, "nothing".into())),
                    }
                }
            }
        }
        Assertion::Custom { check: predicate, .. } => predicate(response).map_err(|message| Failure::Assertion {
            description: assertion.describe(),
            expected: "check to pass".into(),
            actual: message,
        }),
    }
}

fn apply_capture(
    capture: &Capture,
    response: &CapturedResponse,
    document: Option<&Value>,
    store: &mut EnvironmentStore,
) -> Result<(), Failure> {
    match capture {
        Capture::Path { key, path } => {
            let failure = |reason: String| Failure::Capture {
                key: key.clone(),
                reason,
            };
            let document =
                document.ok_or_else(|| failure("response body is not JSON".into()))?;
            match query(document, path) {
                Ok(Some(value)) => {
                    tracing::debug!(key = key.as_str(), path = path.as_str(), "Captured value");
                    store.set(key.clone(), render_scalar(&value));
                    Ok(())
                }
                Ok(None) => Err(failure(format!("nothing at {path}"))),
                Err(err) => Err(failure(err.to_string())),
            }
        }
        Capture::Extract { keys, extract, .. } => {
            let pairs = extract(response).map_err(|reason| Failure::Capture {
                key: keys.join(", "),
                reason,
            })?;
            for (key, value) in pairs {
                tracing::debug!(key = key.as_str(), "Captured value");
                store.set(key, value);
            }
            Ok(())
        }
    }
}

fn body_excerpt(response: &CapturedResponse) -> String {
    const LIMIT: usize = 200;
    if response.body.len() <= LIMIT {
        return response.body.clone();
    }
    let mut end = LIMIT;
    while !response.body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &response.body[..end])
}

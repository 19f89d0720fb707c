//! Per-case outcomes and the suite summary.

use crate::transport::TransportError;
use api_chain_core::TemplateError;
use std::fmt;
use std::time::Duration;

/// Why a case failed. A case may collect several.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The request could not be rendered.
    Resolution(TemplateError),
    /// The request could not be sent or read.
    Transport(TransportError),
    /// An assertion did not hold.
    Assertion {
        /// What was checked
        description: String,
        /// Expected value, rendered
        expected: String,
        /// Actual value, rendered
        actual: String,
    },
    /// A capture could not extract its value.
    Capture {
        /// Key (or keys) being captured
        key: String,
        /// Why it failed
        reason: String,
    },
    /// A declared output was not in the environment after teardown.
    MissingOutput {
        /// The missing key
        key: String,
    },
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolution(err) => write!(f, "request rendering failed: {err}"),
            Self::Transport(err) => write!(f, "{err}"),
            Self::Assertion {
                description,
                expected,
                actual,
            } => write!(f, "{description}: expected {expected}, got {actual}"),
            Self::Capture { key, reason } => write!(f, "capture of {key} failed: {reason}"),
            Self::MissingOutput { key } => write!(f, "declared output '{key}' was not produced"),
        }
    }
}

/// Why a case was not executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// A required key was absent from every scope.
    MissingDependency {
        /// The absent key
        key: String,
    },
    /// The case that last wrote a required key failed in this run.
    UpstreamFailed {
        /// The key whose producer failed
        key: String,
        /// The failed producer
        case: String,
    },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDependency { key } => write!(f, "missing dependency '{key}'"),
            Self::UpstreamFailed { key, case } => {
                write!(f, "'{key}' comes from failed case '{case}'")
            }
        }
    }
}

/// Outcome of one case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseOutcome {
    /// Every assertion and capture succeeded.
    Passed,
    /// At least one failure.
    Failed(Vec<Failure>),
    /// Not executed.
    Skipped(SkipReason),
}

impl CaseOutcome {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed(_) => "failed",
            Self::Skipped(_) => "skipped",
        }
    }
}

/// Report for one case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseReport {
    /// Case name
    pub name: String,
    /// Outcome
    pub outcome: CaseOutcome,
    /// Response status, when a response arrived
    pub status: Option<u16>,
    /// Wall time spent on the case
    pub duration: Duration,
}

impl CaseReport {
    /// Whether the case passed.
    #[must_use]
    pub const fn passed(&self) -> bool {
        matches!(self.outcome, CaseOutcome::Passed)
    }

    /// Failures, empty unless the case failed.
    #[must_use]
    pub fn failures(&self) -> &[Failure] {
        match &self.outcome {
            CaseOutcome::Failed(failures) => failures.as_slice(),
            CaseOutcome::Passed | CaseOutcome::Skipped(_) => &[],
        }
    }
}

/// Reports for a whole run, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteReport {
    /// Case reports in execution order
    pub cases: Vec<CaseReport>,
}

impl SuiteReport {
    /// Number of passed cases.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.count(|outcome| matches!(outcome, CaseOutcome::Passed))
    }

    /// Number of failed cases.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, CaseOutcome::Failed(_)))
    }

    /// Number of skipped cases.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, CaseOutcome::Skipped(_)))
    }

    /// True when every case passed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.cases.iter().all(CaseReport::passed)
    }

    /// Report for a case by name.
    #[must_use]
    pub fn case(&self, name: &str) -> Option<&CaseReport> {
        self.cases.iter().find(|case| case.name == name)
    }

    /// One-line summary.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} cases: {} passed, {} failed, {} skipped",
            self.cases.len(),
            self.passed(),
            self.failed(),
            self.skipped()
        )
    }

    fn count(&self, predicate: impl Fn(&CaseOutcome) -> bool) -> usize {
        self.cases.iter().filter(|case| predicate(&case.outcome)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(name: &str, outcome: CaseOutcome) -> CaseReport {
        CaseReport {
            name: name.to_string(),
            outcome,
            status: None,
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn test_summary_counts() {
        let suite = SuiteReport {
            cases: vec![
                report("a", CaseOutcome::Passed),
                report(
                    "b",
                    CaseOutcome::Failed(vec![Failure::MissingOutput {
                        key: "last_code_id".to_string(),
                    }]),
                ),
                report(
                    "c",
                    CaseOutcome::Skipped(SkipReason::UpstreamFailed {
                        key: "last_code_id".to_string(),
                        case: "b".to_string(),
                    }),
                ),
            ],
        };

        assert_eq!(suite.summary(), "3 cases: 1 passed, 1 failed, 1 skipped");
        assert!(!suite.is_success());
        assert_eq!(suite.case("b").map(|c| c.failures().len()), Some(1));
        assert_eq!(
            suite.case("c").map(|c| c.outcome.label()),
            Some("skipped")
        );
    }

    #[test]
    fn test_failure_display() {
        let failure = Failure::Assertion {
            description: "$.max_uses should equal 10".to_string(),
            expected: "10".to_string(),
            actual: "9".to_string(),
        };
        assert_eq!(
            failure.to_string(),
            "$.max_uses should equal 10: expected 10, got 9"
        );
        assert_eq!(
            SkipReason::MissingDependency {
                key: "user_token".to_string()
            }
            .to_string(),
            "missing dependency 'user_token'"
        );
    }
}

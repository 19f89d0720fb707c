//! Metric names recorded by the runner.
//!
//! Recording goes through the `metrics` facade. No exporter is installed
//! here; a binary that wants Prometheus output installs its own recorder and
//! calls [`describe_metrics`] once at startup.

use metrics::{Unit, describe_counter, describe_histogram};

// Re-export metrics macros for use in other modules
pub use metrics::{counter, histogram};

/// Cases finished, labelled by `outcome` (`passed`, `failed`, `skipped`).
pub const CASES_TOTAL: &str = "api_chain_cases_total";

/// Time from sending a request to reading the full response.
pub const REQUEST_DURATION_SECONDS: &str = "api_chain_request_duration_seconds";

/// Requests that failed at the transport layer.
pub const TRANSPORT_ERRORS_TOTAL: &str = "api_chain_transport_errors_total";

/// Register descriptions for every metric above.
pub fn describe_metrics() {
    describe_counter!(CASES_TOTAL, "Total number of test cases finished, by outcome");
    describe_histogram!(
        REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "Request round-trip time in seconds"
    );
    describe_counter!(
        TRANSPORT_ERRORS_TOTAL,
        "Total number of requests that failed before a response arrived"
    );
}

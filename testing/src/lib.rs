//! # API Chain Testing
//!
//! Testing utilities for chained API scenarios.
//!
//! This crate provides:
//! - Deterministic clocks for the dynamic generators
//! - [`MockTransport`]: canned responses, recorded requests
//! - [`CaseTest`]: a Given-When-Then helper for single test cases
//!
//! ## Example
//!
//! ```
//! use api_chain_core::RequestTemplate;
//! use api_chain_runtime::{Assertion, Capture, TestCase};
//! use api_chain_testing::CaseTest;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let case = TestCase::new(
//!     "create ticket type",
//!     RequestTemplate::post("/events/{{last_event_id}}/ticket_types"),
//! )
//! .assert(Assertion::status(201))
//! .capture(Capture::path("last_ticket_type_id", "$.id"));
//!
//! CaseTest::new(case)
//!     .given_env("last_event_id", "EV1")
//!     .when_responding(201, json!({"id": "TT1"}))
//!     .then_report(|report| assert!(report.passed()))
//!     .then_store(|store| assert_eq!(store.get("last_ticket_type_id"), Some("TT1")))
//!     .then_request(|request| assert_eq!(request.path, "/events/EV1/ticket_types"))
//!     .run()
//!     .await;
//! # }
//! ```

use api_chain_core::Clock;
use chrono::{DateTime, Utc};

pub mod case_test;
pub mod mock_transport;

/// Deterministic clocks.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::Duration;
    use std::sync::Mutex;
    use std::sync::PoisonError;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use api_chain_testing::mocks::FixedClock;
    /// use api_chain_core::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that advances by a fixed step on every read.
    ///
    /// Lets tests observe that each `{{$timestamp}}` occurrence is evaluated
    /// separately.
    #[derive(Debug)]
    pub struct SteppingClock {
        next: Mutex<DateTime<Utc>>,
        step: Duration,
    }

    impl SteppingClock {
        /// Start at `start`, advancing by `step` after each read.
        #[must_use]
        pub const fn new(start: DateTime<Utc>, step: Duration) -> Self {
            Self {
                next: Mutex::new(start),
                step,
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
            let now = *next;
            *next = now + self.step;
            now
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

// Re-export commonly used items
pub use case_test::CaseTest;
pub use mock_transport::{MockTransport, json_response};
pub use mocks::{FixedClock, SteppingClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
        assert_eq!(time1.timestamp_millis(), 1_735_689_600_000);
    }

    #[test]
    fn test_stepping_clock() {
        let clock = SteppingClock::new(test_clock().now(), Duration::milliseconds(1));
        let first = clock.now();
        let second = clock.now();
        assert_eq!(second - first, Duration::milliseconds(1));
    }
}

//! # API Chain Runtime
//!
//! Executes chained API scenarios built from `api-chain-core` templates.
//!
//! ## Core Components
//!
//! - **Transport**: sends a rendered request once and captures the response
//! - **Test Case**: a request template plus assertions and captures
//! - **Plan**: orders cases by the keys they read and write
//! - **Suite Runner**: runs the plan sequentially against one environment store
//! - **Report**: per-case outcomes and a suite summary
//!
//! ## Example
//!
//! ```no_run
//! use api_chain_core::{EnvironmentStore, RequestTemplate};
//! use api_chain_runtime::{Assertion, Capture, HttpTransport, SuiteRunner, TestCase};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpTransport::new("http://localhost:8088")?;
//! let runner = SuiteRunner::new(Arc::new(transport));
//!
//! let cases = vec![
//!     TestCase::new(
//!         "create ticket type",
//!         RequestTemplate::post("/events/{{last_event_id}}/ticket_types")
//!             .bearer("{{org_member_token}}"),
//!     )
//!     .assert(Assertion::status(201))
//!     .capture(Capture::path("last_ticket_type_id", "$.id")),
//! ];
//!
//! let mut store = EnvironmentStore::load("environment.json")?;
//! let report = runner.run(&cases, &mut store).await?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

pub mod case;
pub mod config;
pub mod metrics;
pub mod plan;
pub mod query;
pub mod report;
pub mod runner;
pub mod transport;

pub use case::{Assertion, Capture, Expected, TestCase};
pub use config::{ConfigError, SuiteConfig};
pub use plan::{Plan, PlanError};
pub use report::{CaseOutcome, CaseReport, Failure, SkipReason, SuiteReport};
pub use runner::SuiteRunner;
pub use transport::{CapturedResponse, HttpTransport, Transport, TransportError, TransportFuture};

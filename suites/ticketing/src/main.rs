//! Ticketing suite runner.
//!
//! Loads the baseline environment, runs every scenario against the
//! configured server and exports the resulting environment. Exits non-zero
//! when any case failed or was skipped.

use anyhow::Context;
use api_chain_runtime::{CaseOutcome, HttpTransport, SuiteConfig, SuiteRunner, metrics};
use std::process::ExitCode;
use std::sync::Arc;
use ticketing_suite::suite;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let config = SuiteConfig::from_env().context("Invalid configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    metrics::describe_metrics();

    let mut store = config
        .load_environment()
        .context("Failed to load baseline environment")?;
    let server = config.server_url(&store)?;
    info!(%server, keys = store.len(), "Configuration loaded");

    let transport = HttpTransport::with_timeout(&server, config.timeout)
        .with_context(|| format!("Cannot reach {server}"))?;
    let runner = SuiteRunner::new(Arc::new(transport)).with_policy(config.unresolved);

    let report = runner
        .run(&suite(), &mut store)
        .await
        .context("Suite could not be planned")?;

    for case in &report.cases {
        for failure in case.failures() {
            error!(case = %case.name, %failure, "Case failed");
        }
        if let CaseOutcome::Skipped(reason) = &case.outcome {
            warn!(case = %case.name, %reason, "Case skipped");
        }
    }

    config
        .export_environment(&store)
        .context("Failed to export environment")?;

    info!(summary = %report.summary(), "Done");
    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

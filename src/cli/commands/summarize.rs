//! Summarize command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{FailurePolicy, Settings};
use crate::orchestrator::{Orchestrator, SummaryResponse};
use anyhow::Result;

/// Run the summarize command.
pub async fn run_summarize(document_id: &str, raw: bool, settings: Settings) -> Result<()> {
    let credentials = match preflight::check(Operation::Query) {
        Ok(c) => c,
        Err(e) => {
            Output::error(&format!("{}", e));
            return Err(e.into());
        }
    };

    let policy = settings.server.failure_policy;
    let orchestrator = Orchestrator::new(settings, &credentials)?;
    let spinner = Output::spinner("Summarizing document...");

    let response = match orchestrator.summarize(document_id).await {
        Ok(response) => response,
        Err(e) => {
            spinner.finish_and_clear();
            if policy == FailurePolicy::Propagate {
                Output::error(&format!("Failed to summarize: {}", e));
                return Err(e.into());
            }
            Output::warning(&format!("{}", e));
            SummaryResponse::degraded(&e)
        }
    };
    spinner.finish_and_clear();

    println!("\n{}\n", response.summary);
    if raw && !response.raw_summary.is_empty() {
        Output::header("Raw summary");
        println!("{}", response.raw_summary);
    }

    Ok(())
}

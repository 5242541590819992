//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{FailurePolicy, Settings};
use crate::orchestrator::{Orchestrator, QueryResponse};
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(document_id: &str, question: &str, raw: bool, settings: Settings) -> Result<()> {
    let credentials = match preflight::check(Operation::Query) {
        Ok(c) => c,
        Err(e) => {
            Output::error(&format!("{}", e));
            return Err(e.into());
        }
    };

    let policy = settings.server.failure_policy;
    let orchestrator = Orchestrator::new(settings, &credentials)?;
    let spinner = Output::spinner("Searching document...");

    let response = match orchestrator.query(document_id, question).await {
        Ok(response) => response,
        Err(e) => {
            spinner.finish_and_clear();
            if policy == FailurePolicy::Propagate {
                Output::error(&format!("Failed to generate answer: {}", e));
                return Err(e.into());
            }
            Output::warning(&format!("{}", e));
            QueryResponse::degraded(&e)
        }
    };
    spinner.finish_and_clear();

    println!("\n{}\n", response.answer);
    if raw && !response.raw_answer.is_empty() {
        Output::header("Raw answer");
        println!("{}", response.raw_answer);
    }

    Ok(())
}

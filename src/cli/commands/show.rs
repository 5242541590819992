//! Show command implementation.

use crate::cli::output::content_preview;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

const PREVIEW_CHARS: usize = 500;

/// Run the show command.
pub async fn run_show(document_id: &str, full: bool, settings: Settings) -> Result<()> {
    let credentials = match preflight::check(Operation::Query) {
        Ok(c) => c,
        Err(e) => {
            Output::error(&format!("{}", e));
            return Err(e.into());
        }
    };

    let orchestrator = Orchestrator::new(settings, &credentials)?;
    let spinner = Output::spinner("Extracting document...");
    let data = orchestrator.document_data(document_id).await;
    spinner.finish_and_clear();

    let data = match data {
        Ok(data) => data,
        Err(e) => {
            Output::error(&format!("Failed to read document: {}", e));
            return Err(e.into());
        }
    };

    if !data.metadata.is_empty() {
        Output::header("Metadata");
        for (key, value) in &data.metadata {
            Output::kv(key, value);
        }
    }

    Output::header("Key points");
    if data.key_points.is_empty() {
        Output::info("None found.");
    }
    for point in &data.key_points {
        Output::list_item(point);
    }

    Output::header("Keywords");
    println!("  {}", data.keywords.join(", "));

    for (i, table) in data.tables.iter().enumerate() {
        Output::header(&format!("Table {}", i + 1));
        Output::table(table);
    }

    Output::header("Text");
    if full {
        println!("{}", data.text);
    } else {
        println!("  {}", content_preview(&data.text, PREVIEW_CHARS));
    }

    Ok(())
}

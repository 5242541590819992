//! Upload command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::document::FileKind;
use crate::orchestrator::Orchestrator;
use anyhow::{Context, Result};
use std::path::Path;

/// Run the upload command.
pub async fn run_upload(file: &Path, settings: Settings) -> Result<()> {
    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Not a file path: {}", file.display()))?;
    let kind = FileKind::from_filename(filename)?;

    let credentials = match preflight::check(Operation::Upload(kind)) {
        Ok(c) => c,
        Err(e) => {
            Output::error(&format!("{}", e));
            return Err(e.into());
        }
    };

    let data = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let orchestrator = Orchestrator::new(settings, &credentials)?;
    let spinner = Output::spinner(&format!("Uploading {}...", filename));

    match orchestrator.upload(filename, &data).await {
        Ok(receipt) => {
            spinner.finish_and_clear();
            Output::success(&format!("Uploaded {}", filename));
            Output::kv("Document ID", &receipt.document_id);
            Output::kv("Original", &receipt.original_key);
            Output::kv("Compressed", &receipt.compressed_key);
            Ok(())
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Upload failed: {}", e));
            Err(e.into())
        }
    }
}

//! Pre-flight checks before expensive operations.
//!
//! Validates that credentials and external tools are available before
//! starting operations that would otherwise fail midway.

use crate::config::Credentials;
use crate::document::FileKind;
use crate::error::{DocqueryError, Result};
use std::process::Command;
use tracing::warn;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// The server needs credentials; ffmpeg only for video uploads.
    Serve,
    /// Uploading needs credentials, plus ffmpeg for videos.
    Upload(FileKind),
    /// Questions, summaries and document data need credentials.
    Query,
}

/// Run pre-flight checks for the given operation.
///
/// Returns the credentials if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation) -> Result<Credentials> {
    let credentials = Credentials::from_env()?;
    match operation {
        Operation::Serve => {
            if let Err(e) = check_tool("ffmpeg") {
                warn!("{}; video uploads will fail", e);
            }
        }
        Operation::Upload(FileKind::Mp4) => check_tool("ffmpeg")?,
        Operation::Upload(FileKind::Pdf) | Operation::Query => {}
    }
    Ok(credentials)
}

/// Check if an external tool is available.
pub fn check_tool(name: &str) -> Result<()> {
    // ffmpeg uses -version (single dash), others use --version
    let version_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    };
    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(DocqueryError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(DocqueryError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(DocqueryError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool_is_reported() {
        let err = check_tool("definitely-not-a-real-tool-docquery").unwrap_err();
        assert!(matches!(err, DocqueryError::ToolNotFound(_)));
    }
}

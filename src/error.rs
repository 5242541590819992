//! Error types for docquery.

use serde::Serialize;
use thiserror::Error;

/// Which half of the two-stage answerer failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Raw answer generation (first endpoint).
    Generation,
    /// Markdown formatting (second endpoint).
    Formatting,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Generation => write!(f, "generation"),
            Stage::Formatting => write!(f, "formatting"),
        }
    }
}

/// Library-level error type for docquery operations.
#[derive(Error, Debug)]
pub enum DocqueryError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid document ID: {0}")]
    InvalidDocumentId(String),

    #[error("File type not allowed: {0}")]
    UnsupportedFileType(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Compression failed: {0}")]
    Compression(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Embedding dimension mismatch: index expects {expected}, query produced {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding model mismatch: index built with {indexed}, query embedded with {current}")]
    ModelMismatch { indexed: String, current: String },

    #[error("Index format error: {0}")]
    IndexFormat(String),

    #[error("{stage} failed: {message}")]
    Generation { stage: Stage, message: String },

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Machine-readable error category, stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Storage,
    Extraction,
    Compression,
    Embedding,
    DimensionMismatch,
    IndexFormat,
    Generation,
    Config,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Storage => "storage",
            ErrorKind::Extraction => "extraction",
            ErrorKind::Compression => "compression",
            ErrorKind::Embedding => "embedding",
            ErrorKind::DimensionMismatch => "dimension_mismatch",
            ErrorKind::IndexFormat => "index_format",
            ErrorKind::Generation => "generation",
            ErrorKind::Config => "config",
            ErrorKind::Internal => "internal",
        }
    }
}

impl DocqueryError {
    /// Classify this error for clients and status-code mapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DocqueryError::InvalidDocumentId(_)
            | DocqueryError::UnsupportedFileType(_)
            | DocqueryError::InvalidInput(_) => ErrorKind::Validation,
            DocqueryError::NotFound(_) => ErrorKind::NotFound,
            DocqueryError::Storage(_) => ErrorKind::Storage,
            DocqueryError::Extraction(_) => ErrorKind::Extraction,
            DocqueryError::Compression(_) | DocqueryError::ToolNotFound(_) => {
                ErrorKind::Compression
            }
            DocqueryError::Embedding(_) => ErrorKind::Embedding,
            DocqueryError::DimensionMismatch { .. } | DocqueryError::ModelMismatch { .. } => {
                ErrorKind::DimensionMismatch
            }
            DocqueryError::IndexFormat(_) => ErrorKind::IndexFormat,
            DocqueryError::Generation { .. } => ErrorKind::Generation,
            DocqueryError::Config(_) | DocqueryError::TomlParse(_) => ErrorKind::Config,
            DocqueryError::Io(_) | DocqueryError::Json(_) | DocqueryError::Http(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub(crate) fn generation(stage: Stage, message: impl Into<String>) -> Self {
        DocqueryError::Generation {
            stage,
            message: message.into(),
        }
    }
}

/// Client-facing description of a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&DocqueryError> for ErrorReport {
    fn from(err: &DocqueryError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for docquery operations.
pub type Result<T> = std::result::Result<T, DocqueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            DocqueryError::InvalidDocumentId("x".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            DocqueryError::generation(Stage::Formatting, "boom").kind(),
            ErrorKind::Generation
        );
        assert_eq!(
            DocqueryError::DimensionMismatch { expected: 3, actual: 4 }.kind(),
            ErrorKind::DimensionMismatch
        );
    }

    #[test]
    fn test_report_serializes_kind_in_snake_case() {
        let err = DocqueryError::NotFound("documents/x.pdf".into());
        let json = serde_json::to_value(ErrorReport::from(&err)).unwrap();
        assert_eq!(json["kind"], "not_found");
        assert_eq!(json["message"], "Not found: documents/x.pdf");
    }

    #[test]
    fn test_generation_message_names_stage() {
        let err = DocqueryError::generation(Stage::Generation, "timed out");
        assert_eq!(err.to_string(), "generation failed: timed out");
    }
}

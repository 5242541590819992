//! Document identity and blob key naming.

use crate::error::{DocqueryError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use uuid::Uuid;

static DOCUMENT_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-f0-9]{32}\.(pdf|mp4)$").expect("document id pattern is valid")
});

/// Accepted upload types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Mp4,
}

impl FileKind {
    /// Extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            FileKind::Pdf => "pdf",
            FileKind::Mp4 => "mp4",
        }
    }

    /// Determine the kind from an uploaded file name (case-insensitive).
    pub fn from_filename(filename: &str) -> Result<Self> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => Ok(FileKind::Pdf),
            "mp4" => Ok(FileKind::Mp4),
            _ => Err(DocqueryError::UnsupportedFileType(filename.to_string())),
        }
    }
}

/// Validated `<32 lowercase hex><.pdf|.mp4>` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Validate a client-supplied identifier.
    pub fn parse(raw: &str) -> Result<Self> {
        if DOCUMENT_ID_RE.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(DocqueryError::InvalidDocumentId(raw.to_string()))
        }
    }

    /// Generate a fresh identifier for an upload.
    pub fn generate(kind: FileKind) -> Self {
        Self(format!("{}.{}", Uuid::new_v4().simple(), kind.extension()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> FileKind {
        if self.0.ends_with(".pdf") {
            FileKind::Pdf
        } else {
            FileKind::Mp4
        }
    }

    /// Key of the uploaded original.
    pub fn original_key(&self) -> String {
        format!("documents/{}", self.0)
    }

    /// Key of the compressed copy.
    pub fn compressed_key(&self) -> String {
        format!("compressed/{}", self.0)
    }

    /// Key of the vector data artifact.
    pub fn index_primary_key(&self) -> String {
        format!("indexes/{}_index.primary", self.0)
    }

    /// Key of the chunk metadata artifact.
    pub fn index_sidecar_key(&self) -> String {
        format!("indexes/{}_index.sidecar", self.0)
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for DocumentId {
    type Err = DocqueryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A stored upload.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: DocumentId,
    pub kind: FileKind,
    pub original_key: String,
    pub compressed_key: String,
}

impl Document {
    pub fn new(id: DocumentId) -> Self {
        Self {
            kind: id.kind(),
            original_key: id.original_key(),
            compressed_key: id.compressed_key(),
            id,
        }
    }
}

//! PDF text extraction.
//!
//! Pulls plain text out of every page, the document Info dictionary, and any
//! column-aligned blocks that look like tables.

pub mod insights;

pub use insights::{parse_model_insights, DocumentInsights, KeywordCounter};

use crate::error::{DocqueryError, Result};
use lopdf::{Document, Object};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, instrument};

static CELL_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\t+| {2,}").expect("cell separator pattern is valid"));

/// A table is a list of rows of cells.
pub type Table = Vec<Vec<String>>;

/// Text of a single page.
#[derive(Debug, Clone, Serialize)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

/// Everything pulled out of one PDF.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractedPdf {
    /// Page texts joined, each followed by a newline.
    pub text: String,
    pub pages: Vec<PageText>,
    pub metadata: BTreeMap<String, String>,
    pub tables: Vec<Table>,
}

/// Extract text, metadata and tables from a PDF on disk.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn extract_pdf(path: &Path) -> Result<ExtractedPdf> {
    let document = Document::load(path)
        .map_err(|e| DocqueryError::Extraction(format!("cannot open PDF: {}", e)))?;

    let mut text = String::new();
    let mut pages = Vec::new();
    let mut tables = Vec::new();

    for (page_no, _page_id) in document.get_pages() {
        let page_text = document
            .extract_text(&[page_no])
            .map_err(|e| DocqueryError::Extraction(format!("page {}: {}", page_no, e)))?;

        if page_text.trim().is_empty() {
            continue;
        }

        tables.extend(detect_tables(&page_text));
        text.push_str(&page_text);
        text.push('\n');
        pages.push(PageText {
            number: page_no,
            text: page_text,
        });
    }

    let metadata = read_metadata(&document);
    debug!(
        "Extracted {} chars from {} pages ({} tables)",
        text.len(),
        pages.len(),
        tables.len()
    );

    Ok(ExtractedPdf {
        text,
        pages,
        metadata,
        tables,
    })
}

/// Run [`extract_pdf`] off the async executor.
pub async fn extract_pdf_blocking(path: PathBuf) -> Result<ExtractedPdf> {
    tokio::task::spawn_blocking(move || extract_pdf(&path))
        .await
        .map_err(|e| DocqueryError::Extraction(format!("extraction task failed: {}", e)))?
}

/// Render the Info dictionary as strings. Missing or malformed Info is empty.
fn read_metadata(document: &Document) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();

    let info = match document.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => document.get_object(*id).ok(),
        Ok(other) => Some(other),
        Err(_) => None,
    };
    let Some(Ok(dict)) = info.map(|o| o.as_dict()) else {
        return metadata;
    };

    for (key, value) in dict.iter() {
        let rendered = match value {
            Object::String(bytes, _) => decode_pdf_string(bytes),
            Object::Name(name) => String::from_utf8_lossy(name).into_owned(),
            Object::Integer(i) => i.to_string(),
            Object::Real(r) => r.to_string(),
            Object::Boolean(b) => b.to_string(),
            _ => continue,
        };
        metadata.insert(String::from_utf8_lossy(key).into_owned(), rendered);
    }

    metadata
}

/// Decode a PDF text string (UTF-16BE with BOM, otherwise single-byte).
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

/// Find runs of two or more lines that split into the same number (≥2) of cells.
pub fn detect_tables(page_text: &str) -> Vec<Table> {
    let mut tables = Vec::new();
    let mut current: Table = Vec::new();

    let flush = |current: &mut Table, tables: &mut Vec<Table>| {
        if current.len() >= 2 {
            tables.push(std::mem::take(current));
        } else {
            current.clear();
        }
    };

    for line in page_text.lines() {
        let cells: Vec<String> = CELL_SEPARATOR
            .split(line.trim())
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        if cells.len() < 2 {
            flush(&mut current, &mut tables);
            continue;
        }

        if current.first().is_some_and(|row| row.len() != cells.len()) {
            flush(&mut current, &mut tables);
        }
        current.push(cells);
    }
    flush(&mut current, &mut tables);

    tables
}

//! docquery - question answering over uploaded documents
//!
//! Ingests PDF and MP4 uploads into a blob store, builds a per-document
//! vector index over the PDF text, and answers questions and summaries with
//! a two-stage pipeline: one model writes a plain answer from the retrieved
//! passages, a second lays it out as Markdown.
//!
//! # Architecture
//!
//! - `config` - Settings, prompt templates and credentials
//! - `document` - Document identifiers and blob keys
//! - `storage` - Blob store abstraction (filesystem bucket, in-memory)
//! - `extract` - PDF text, metadata, tables and insights
//! - `compress` - Compressed copies of uploads
//! - `chunking` - Overlapping text windows
//! - `embedding` - Embedding generation
//! - `index` - Flat vector index and its two-artifact format
//! - `llm` - Completion endpoints
//! - `rag` - Retrieval and two-stage answering
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use docquery::config::{Credentials, Settings};
//! use docquery::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let credentials = Credentials::from_env()?;
//!     let orchestrator = Orchestrator::new(settings, &credentials)?;
//!
//!     let pdf = std::fs::read("report.pdf")?;
//!     let receipt = orchestrator.upload("report.pdf", &pdf).await?;
//!
//!     let response = orchestrator.query(&receipt.document_id, "What is the main finding?").await?;
//!     println!("{}", response.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod compress;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod index;
pub mod llm;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use error::{DocqueryError, Result};

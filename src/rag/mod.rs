//! Retrieval-augmented answering over a single document.
//!
//! Retrieval pulls the closest chunks from the document's index, the
//! two-stage answerer turns them into a raw answer and then into Markdown.

pub mod answerer;
pub mod context;
mod format;

pub use answerer::{StagedAnswer, Task, TaskSampling, TwoStageAnswerer};
pub use context::{Retrieval, Retriever};
pub use format::ResponseFormatter;

use serde::{Deserialize, Serialize};

/// Rendering applied to the formatted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown as produced by the formatting model.
    #[default]
    Markdown,
    /// CommonMark rendered to HTML, with raw HTML escaped.
    Html,
}

//! Text chunking for retrieval.
//!
//! Splits extracted document text into overlapping character windows. Sizes
//! are counted in `char`s so multi-byte text never splits inside a code point.

mod splitter;

pub use splitter::TextSplitter;

use serde::{Deserialize, Serialize};

/// A window of document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Text content of this chunk.
    pub text: String,
    /// Position of this chunk in the document.
    pub order: usize,
    /// Character offset of the first character.
    pub start: usize,
}

impl Chunk {
    /// Length in characters.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// How window ends are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingStrategy {
    /// Every window except the last is exactly `chunk_size` characters.
    #[default]
    Fixed,
    /// Windows end at a paragraph, line or word break when one is available.
    Boundary,
}

impl std::str::FromStr for ChunkingStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fixed" => Ok(ChunkingStrategy::Fixed),
            "boundary" => Ok(ChunkingStrategy::Boundary),
            _ => Err(format!("Unknown chunking strategy: {}", s)),
        }
    }
}

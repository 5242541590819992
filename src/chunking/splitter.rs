//! Overlapping window splitter.

use super::{Chunk, ChunkingStrategy};
use crate::config::ChunkingSettings;
use crate::error::{DocqueryError, Result};

/// Separators tried in order when looking for a window boundary.
const SEPARATORS: &[&str] = &["\n\n", "\n", " "];

/// Splits text into windows of at most `chunk_size` characters where
/// consecutive windows share exactly `chunk_overlap` characters.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    strategy: ChunkingStrategy,
}

impl TextSplitter {
    /// Create a splitter; `chunk_overlap` must be smaller than `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize, strategy: ChunkingStrategy) -> Result<Self> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(DocqueryError::Config(format!(
                "invalid chunking: size {} overlap {}",
                chunk_size, chunk_overlap
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            strategy,
        })
    }

    pub fn from_settings(settings: &ChunkingSettings) -> Result<Self> {
        Self::new(settings.chunk_size, settings.chunk_overlap, settings.strategy)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split text into ordered chunks. Empty input yields no chunks.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        let chars: Vec<char> = text.chars().collect();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let limit = (start + self.chunk_size).min(chars.len());
            let end = if limit == chars.len() {
                limit
            } else {
                match self.strategy {
                    ChunkingStrategy::Fixed => limit,
                    ChunkingStrategy::Boundary => self.boundary_end(&chars, start, limit),
                }
            };

            chunks.push(Chunk {
                text: chars[start..end].iter().collect(),
                order: chunks.len(),
                start,
            });

            if end == chars.len() {
                break;
            }
            start = end - self.chunk_overlap;
        }

        chunks
    }

    /// Latest separator end inside the back half of the window, or `limit`.
    ///
    /// The returned end is always greater than `start + chunk_overlap`, so the
    /// next window starts strictly after this one.
    fn boundary_end(&self, chars: &[char], start: usize, limit: usize) -> usize {
        let floor = (start + self.chunk_overlap + 1).max(start + self.chunk_size / 2);

        for sep in SEPARATORS {
            let sep: Vec<char> = sep.chars().collect();
            let mut pos = limit;
            while pos >= floor && pos >= sep.len() {
                if chars[pos - sep.len()..pos] == sep[..] {
                    return pos;
                }
                pos -= 1;
            }
        }
        limit
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            strategy: ChunkingStrategy::Fixed,
        }
    }
}

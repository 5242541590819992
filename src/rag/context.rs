//! Context building for answers.

use crate::embedding::Embedder;
use crate::error::{DocqueryError, Result};
use crate::index::{SearchHit, VectorIndex};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Chunks retrieved for one question.
#[derive(Debug, Clone)]
pub struct Retrieval {
    /// Chunk texts joined with newlines, best match first.
    pub context: String,
    pub hits: Vec<SearchHit>,
}

/// Embeds questions and pulls the closest chunks from an index.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    /// Retrieve the `k` chunks closest to `question`.
    #[instrument(skip(self, index, question))]
    pub async fn retrieve(&self, index: &VectorIndex, question: &str, k: usize) -> Result<Retrieval> {
        if index.model() != self.embedder.model() {
            return Err(DocqueryError::ModelMismatch {
                indexed: index.model().to_string(),
                current: self.embedder.model().to_string(),
            });
        }

        let query = self.embedder.embed(question).await?;
        if query.len() != index.dimension() {
            return Err(DocqueryError::DimensionMismatch {
                expected: index.dimension(),
                actual: query.len(),
            });
        }

        let hits = index.search(&query, k)?;
        debug!(hits = hits.len(), "Retrieved context");

        Ok(Retrieval {
            context: join_context(&hits),
            hits,
        })
    }
}

/// Join hit texts in ranked order.
pub fn join_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| hit.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

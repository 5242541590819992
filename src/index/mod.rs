//! Per-document vector index.
//!
//! A flat, exact nearest-neighbour index over chunk embeddings. Built once
//! at upload time and never mutated afterwards.

mod codec;
mod repository;

pub use codec::{IndexArtifacts, Sidecar, FORMAT_VERSION};
pub use repository::IndexRepository;

use crate::chunking::Chunk;
use crate::embedding::Embedder;
use crate::error::{DocqueryError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Similarity measure used to rank entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Squared Euclidean distance, lower is closer.
    #[default]
    L2,
    /// Dot product, higher is closer. Suited to normalized embeddings.
    InnerProduct,
    /// Cosine similarity, higher is closer.
    Cosine,
}

impl Metric {
    /// Score a stored vector against a query.
    pub fn score(&self, query: &[f32], stored: &[f32]) -> f32 {
        match self {
            Metric::L2 => squared_l2(query, stored),
            Metric::InnerProduct => inner_product(query, stored),
            Metric::Cosine => cosine_similarity(query, stored),
        }
    }

    /// Whether a lower score ranks first.
    pub fn lower_is_closer(&self) -> bool {
        matches!(self, Metric::L2)
    }
}

/// One stored chunk with its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub text: String,
    pub embedding: Vec<f32>,
}

/// A ranked search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Insertion position of the entry (chunk order).
    pub position: usize,
    /// Chunk text.
    pub text: String,
    /// Metric value; see [`Metric`] for direction.
    pub score: f32,
}

/// Exact vector index for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    model: String,
    dimension: usize,
    metric: Metric,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Create an index from already-embedded entries.
    pub fn from_entries(
        model: &str,
        dimension: usize,
        metric: Metric,
        entries: Vec<IndexEntry>,
    ) -> Result<Self> {
        if let Some(bad) = entries.iter().find(|e| e.embedding.len() != dimension) {
            return Err(DocqueryError::DimensionMismatch {
                expected: dimension,
                actual: bad.embedding.len(),
            });
        }
        Ok(Self {
            model: model.to_string(),
            dimension,
            metric,
            entries,
        })
    }

    /// Embed every chunk and build the index. Any embedding failure aborts
    /// the whole build.
    #[instrument(skip_all, fields(chunks = chunks.len()))]
    pub async fn build(chunks: &[Chunk], embedder: &dyn Embedder, metric: Metric) -> Result<Self> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;

        if embeddings.len() != texts.len() {
            return Err(DocqueryError::Embedding(format!(
                "Embedder returned {} vectors for {} chunks",
                embeddings.len(),
                texts.len()
            )));
        }

        let entries = texts
            .into_iter()
            .zip(embeddings)
            .map(|(text, embedding)| IndexEntry { text, embedding })
            .collect();

        let index = Self::from_entries(embedder.model(), embedder.dimensions(), metric, entries)?;
        debug!("Built index with {} entries", index.len());
        Ok(index)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `k` closest entries, best first. Ties keep insertion order and a
    /// `k` beyond the entry count returns every entry.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimension {
            return Err(DocqueryError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| SearchHit {
                position,
                text: entry.text.clone(),
                score: self.metric.score(query, &entry.embedding),
            })
            .collect();

        // Stable sort keeps insertion order between equal scores.
        if self.metric.lower_is_closer() {
            hits.sort_by(|a, b| a.score.total_cmp(&b.score));
        } else {
            hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        }
        hits.truncate(k);

        Ok(hits)
    }
}

/// Dot product of two equal-length vectors.
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Squared Euclidean distance.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product = inner_product(a, b);
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

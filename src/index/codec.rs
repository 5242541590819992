//! On-disk format of a vector index.
//!
//! Two artifacts per index:
//!
//! * primary: `b"DQIX" | version: u16 | dimension: u32 | count: u32 | f32 * dimension * count`,
//!   all little-endian;
//! * sidecar: JSON [`Sidecar`] carrying the chunk texts, model, metric and the
//!   SHA-256 of the primary.
//!
//! Loading verifies the header, lengths, entry count and checksum before any
//! vector is trusted.

use super::{IndexEntry, Metric, VectorIndex};
use crate::error::{DocqueryError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const MAGIC: &[u8; 4] = b"DQIX";
const HEADER_LEN: usize = 4 + 2 + 4 + 4;

/// Current artifact format version.
pub const FORMAT_VERSION: u16 = 1;

/// Chunk metadata stored next to the vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sidecar {
    pub version: u16,
    pub model: String,
    pub dimension: usize,
    pub metric: Metric,
    pub created_at: DateTime<Utc>,
    /// Hex SHA-256 of the primary artifact.
    pub checksum: String,
    pub chunks: Vec<String>,
}

/// Serialized form of an index.
#[derive(Debug, Clone)]
pub struct IndexArtifacts {
    pub primary: Vec<u8>,
    pub sidecar: Vec<u8>,
}

fn format_error(msg: impl Into<String>) -> DocqueryError {
    DocqueryError::IndexFormat(msg.into())
}

fn checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

impl VectorIndex {
    /// Serialize into primary and sidecar artifacts.
    pub fn to_artifacts(&self) -> Result<IndexArtifacts> {
        let dimension = u32::try_from(self.dimension)
            .map_err(|_| format_error(format!("dimension {} too large", self.dimension)))?;
        let count = u32::try_from(self.entries.len())
            .map_err(|_| format_error(format!("{} entries too many", self.entries.len())))?;

        let mut primary = Vec::with_capacity(HEADER_LEN + self.entries.len() * self.dimension * 4);
        primary.extend_from_slice(MAGIC);
        primary.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        primary.extend_from_slice(&dimension.to_le_bytes());
        primary.extend_from_slice(&count.to_le_bytes());
        for entry in &self.entries {
            for value in &entry.embedding {
                primary.extend_from_slice(&value.to_le_bytes());
            }
        }

        let sidecar = Sidecar {
            version: FORMAT_VERSION,
            model: self.model.clone(),
            dimension: self.dimension,
            metric: self.metric,
            created_at: Utc::now(),
            checksum: checksum(&primary),
            chunks: self.entries.iter().map(|e| e.text.clone()).collect(),
        };

        Ok(IndexArtifacts {
            primary,
            sidecar: serde_json::to_vec_pretty(&sidecar)?,
        })
    }

    /// Deserialize and verify both artifacts.
    pub fn from_artifacts(primary: &[u8], sidecar: &[u8]) -> Result<Self> {
        let sidecar: Sidecar = serde_json::from_slice(sidecar)
            .map_err(|e| format_error(format!("unreadable sidecar: {}", e)))?;

        if sidecar.version != FORMAT_VERSION {
            return Err(format_error(format!(
                "unsupported sidecar version {}",
                sidecar.version
            )));
        }
        if checksum(primary) != sidecar.checksum {
            return Err(format_error("primary checksum does not match sidecar"));
        }
        if primary.len() < HEADER_LEN || &primary[..4] != MAGIC {
            return Err(format_error("primary artifact has no DQIX header"));
        }

        let version = u16::from_le_bytes([primary[4], primary[5]]);
        let dimension = u32::from_le_bytes([primary[6], primary[7], primary[8], primary[9]]) as usize;
        let count = u32::from_le_bytes([primary[10], primary[11], primary[12], primary[13]]) as usize;

        if version != FORMAT_VERSION {
            return Err(format_error(format!("unsupported primary version {}", version)));
        }
        if dimension != sidecar.dimension {
            return Err(format_error(format!(
                "primary dimension {} disagrees with sidecar {}",
                dimension, sidecar.dimension
            )));
        }
        if count != sidecar.chunks.len() {
            return Err(format_error(format!(
                "primary holds {} vectors but sidecar lists {} chunks",
                count,
                sidecar.chunks.len()
            )));
        }

        let body = &primary[HEADER_LEN..];
        let expected = count
            .checked_mul(dimension)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| format_error("primary size overflows"))?;
        if body.len() != expected {
            return Err(format_error(format!(
                "primary body is {} bytes, expected {}",
                body.len(),
                expected
            )));
        }

        let entries = if dimension == 0 {
            sidecar
                .chunks
                .into_iter()
                .map(|text| IndexEntry { text, embedding: Vec::new() })
                .collect()
        } else {
            body.chunks_exact(dimension * 4)
                .zip(sidecar.chunks)
                .map(|(row, text)| IndexEntry {
                    text,
                    embedding: row
                        .chunks_exact(4)
                        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                        .collect(),
                })
                .collect()
        };

        VectorIndex::from_entries(&sidecar.model, dimension, sidecar.metric, entries)
    }
}

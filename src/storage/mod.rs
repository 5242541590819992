//! Blob store abstraction.
//!
//! The service treats object storage as a flat key/value store keyed by
//! slash-separated paths. It only ever adds objects.

mod fs;
mod memory;

pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;

use crate::error::{DocqueryError, Result};
use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

/// Key/value blob store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under a key, replacing any previous value.
    async fn put(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Fetch the bytes stored under a key. Missing keys are `NotFound`.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Check whether a key exists.
    async fn exists(&self, key: &str) -> Result<bool>;
}

/// Reject keys that could escape a bucket directory.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|part| part.is_empty() || part == "." || part == "..");
    if bad {
        return Err(DocqueryError::Storage(format!("invalid blob key: {:?}", key)));
    }
    Ok(())
}

/// Upload a local file.
pub async fn put_file(store: &dyn BlobStore, key: &str, path: &Path) -> Result<()> {
    let data = tokio::fs::read(path).await?;
    debug!(key = %key, size = data.len(), "Uploading blob");
    store.put(key, &data).await
}

/// Download a blob into a local file.
pub async fn download_to(store: &dyn BlobStore, key: &str, path: &Path) -> Result<()> {
    let data = store.get(key).await?;
    debug!(key = %key, size = data.len(), "Downloaded blob");
    tokio::fs::write(path, data).await?;
    Ok(())
}

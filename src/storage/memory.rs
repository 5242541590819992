//! In-memory blob store.
//!
//! Useful for testing.

use super::{validate_key, BlobStore};
use crate::error::{DocqueryError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory blob store.
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Keys currently stored, sorted.
    pub fn keys(&self) -> Vec<String> {
        let blobs = self.blobs.read().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<String> = blobs.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        validate_key(key)?;
        let mut blobs = self.blobs.write().unwrap_or_else(|e| e.into_inner());
        blobs.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let blobs = self.blobs.read().unwrap_or_else(|e| e.into_inner());
        blobs
            .get(key)
            .cloned()
            .ok_or_else(|| DocqueryError::NotFound(key.to_string()))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let blobs = self.blobs.read().unwrap_or_else(|e| e.into_inner());
        Ok(blobs.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_blob_store() {
        let store = MemoryBlobStore::new();
        store.put("compressed/b.mp4", b"video").await.unwrap();
        store.put("documents/b.mp4", b"original").await.unwrap();

        assert_eq!(store.keys(), vec!["compressed/b.mp4", "documents/b.mp4"]);
        assert_eq!(store.get("documents/b.mp4").await.unwrap(), b"original");
        assert!(matches!(
            store.get("documents/none.mp4").await,
            Err(DocqueryError::NotFound(_))
        ));
    }
}

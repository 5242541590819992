//! Persistence of indexes in the blob store.

use super::VectorIndex;
use crate::document::DocumentId;
use crate::error::Result;
use crate::storage::{download_to, BlobStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Stores and loads per-document indexes.
#[derive(Clone)]
pub struct IndexRepository {
    store: Arc<dyn BlobStore>,
    temp_dir: PathBuf,
}

impl IndexRepository {
    /// `temp_dir` is the parent of the per-request scratch directories.
    pub fn new(store: Arc<dyn BlobStore>, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            temp_dir: temp_dir.into(),
        }
    }

    /// Persist an index. The sidecar is written last and marks the index as complete.
    #[instrument(skip(self, index), fields(document_id = %id, entries = index.len()))]
    pub async fn store(&self, id: &DocumentId, index: &VectorIndex) -> Result<()> {
        let artifacts = index.to_artifacts()?;
        self.store.put(&id.index_primary_key(), &artifacts.primary).await?;
        self.store.put(&id.index_sidecar_key(), &artifacts.sidecar).await?;
        debug!("Stored index artifacts");
        Ok(())
    }

    /// Download both artifacts into a scratch directory and rebuild the
    /// index. The directory is removed whether or not loading succeeds.
    #[instrument(skip(self), fields(document_id = %id))]
    pub async fn load(&self, id: &DocumentId) -> Result<VectorIndex> {
        tokio::fs::create_dir_all(&self.temp_dir).await?;
        let scratch = tempfile::Builder::new()
            .prefix("index-")
            .tempdir_in(&self.temp_dir)?;

        let primary_path = scratch.path().join("index.primary");
        let sidecar_path = scratch.path().join("index.sidecar");

        // Sidecar first: a missing commit record means the index does not exist.
        download_to(self.store.as_ref(), &id.index_sidecar_key(), &sidecar_path).await?;
        download_to(self.store.as_ref(), &id.index_primary_key(), &primary_path).await?;

        let primary = tokio::fs::read(&primary_path).await?;
        let sidecar = tokio::fs::read(&sidecar_path).await?;
        let index = VectorIndex::from_artifacts(&primary, &sidecar)?;

        debug!(entries = index.len(), "Loaded index");
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocqueryError;
    use crate::index::{IndexEntry, Metric};
    use crate::storage::MemoryBlobStore;

    fn id() -> DocumentId {
        DocumentId::parse("0123456789abcdef0123456789abcdef.pdf").unwrap()
    }

    fn index() -> VectorIndex {
        VectorIndex::from_entries(
            "m",
            2,
            Metric::L2,
            vec![IndexEntry { text: "chunk".into(), embedding: vec![0.5, 0.5] }],
        )
        .unwrap()
    }

    fn scratch_entries(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_store_then_load() {
        let store = Arc::new(MemoryBlobStore::new());
        let tmp = tempfile::tempdir().unwrap();
        let repo = IndexRepository::new(store.clone(), tmp.path());

        repo.store(&id(), &index()).await.unwrap();
        let mut keys = store.keys();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "indexes/0123456789abcdef0123456789abcdef.pdf_index.primary",
                "indexes/0123456789abcdef0123456789abcdef.pdf_index.sidecar",
            ]
        );

        let loaded = repo.load(&id()).await.unwrap();
        assert_eq!(loaded, index());
        assert_eq!(scratch_entries(tmp.path()), 0);
    }

    #[tokio::test]
    async fn test_missing_index_is_not_found_and_leaves_no_scratch() {
        let store = Arc::new(MemoryBlobStore::new());
        let tmp = tempfile::tempdir().unwrap();
        let repo = IndexRepository::new(store, tmp.path());

        let err = repo.load(&id()).await.unwrap_err();
        assert!(matches!(err, DocqueryError::NotFound(_)));
        assert_eq!(scratch_entries(tmp.path()), 0);
    }

    #[tokio::test]
    async fn test_corrupt_index_leaves_no_scratch() {
        let store = Arc::new(MemoryBlobStore::new());
        let tmp = tempfile::tempdir().unwrap();
        let repo = IndexRepository::new(store.clone(), tmp.path());

        repo.store(&id(), &index()).await.unwrap();
        store.put(&id().index_primary_key(), b"DQIX").await.unwrap();

        let err = repo.load(&id()).await.unwrap_err();
        assert!(matches!(err, DocqueryError::IndexFormat(_)));
        assert_eq!(scratch_entries(tmp.path()), 0);
    }
}

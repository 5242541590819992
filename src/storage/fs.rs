//! Filesystem-backed bucket.

use super::{validate_key, BlobStore};
use crate::error::{DocqueryError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// A bucket stored as a directory tree: `{root}/{bucket}/{key}`.
pub struct FsBlobStore {
    base_path: PathBuf,
}

impl FsBlobStore {
    /// Open (and create) the bucket directory.
    pub fn new(root: impl Into<PathBuf>, bucket: &str) -> Result<Self> {
        validate_key(bucket)?;
        if bucket.contains('/') {
            return Err(DocqueryError::Config(format!("invalid bucket name: {}", bucket)));
        }
        let base_path = root.into().join(bucket);
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    fn full_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.base_path.join(key))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(key)?;
        debug!(key = %key, size = data.len(), "blob put");

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DocqueryError::Storage(format!("failed to store {}: {}", key, e)))?;
        }

        // Write to a sibling then rename so readers never see a torn object.
        let mut temp_name = full_path.clone().into_os_string();
        temp_name.push(".part");
        let temp_path = PathBuf::from(temp_name);

        let written = match write_synced(&temp_path, data).await {
            Ok(()) => fs::rename(&temp_path, &full_path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            warn!(key = %key, error = %e, "blob write failed");
            let _ = fs::remove_file(&temp_path).await;
            return Err(DocqueryError::Storage(format!("failed to store {}: {}", key, e)));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let full_path = self.full_path(key)?;
        match fs::read(&full_path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(DocqueryError::NotFound(key.to_string()))
            }
            Err(e) => Err(DocqueryError::Storage(format!("failed to read {}: {}", key, e))),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let full_path = self.full_path(key)?;
        Ok(fs::try_exists(full_path).await?)
    }
}

async fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(data).await?;
    file.sync_all().await
}

use std::sync::Arc;

use depot_blob::{BlobStore, DEFAULT_CHUNK_SIZE};
use depot_blob_fs::FsBlobStore;
use depot_blob_memory::MemoryBlobStore;
use tracing::info;

use crate::config::BlobConfig;
use crate::error::ServerError;

/// Create a blob store based on the configuration.
pub async fn create_blob_store(config: &BlobConfig) -> Result<Arc<dyn BlobStore>, ServerError> {
    let chunk_size = config.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);
    if chunk_size == 0 {
        return Err(ServerError::Config("blob chunk_size must be positive".into()));
    }

    match config.backend.as_str() {
        "memory" => {
            info!(chunk_size, "using in-memory blob store");
            Ok(Arc::new(MemoryBlobStore::with_chunk_size(chunk_size)))
        }
        "fs" => {
            let store = FsBlobStore::open_with_chunk_size(&config.path, chunk_size)
                .await
                .map_err(|e| ServerError::Config(format!("failed to open blob store: {e}")))?;
            info!(path = %config.path, chunk_size, "using filesystem blob store");
            Ok(Arc::new(store))
        }
        other => Err(ServerError::Config(format!(
            "unknown blob backend: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend() {
        let store = create_blob_store(&BlobConfig::default()).await.unwrap();
        assert!(store.find_by_name("x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn fs_backend_creates_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        let config = BlobConfig {
            backend: "fs".into(),
            path: root.display().to_string(),
            chunk_size: Some(1024),
        };
        create_blob_store(&config).await.unwrap();
        assert!(root.join("blobs").is_dir());
    }

    #[tokio::test]
    async fn unknown_backend_is_rejected() {
        let config = BlobConfig {
            backend: "s3".into(),
            ..BlobConfig::default()
        };
        let err = create_blob_store(&config).await.err().unwrap();
        assert!(err.to_string().contains("unknown blob backend"));
    }

    #[tokio::test]
    async fn zero_chunk_size_is_rejected() {
        let config = BlobConfig {
            chunk_size: Some(0),
            ..BlobConfig::default()
        };
        assert!(create_blob_store(&config).await.is_err());
    }
}

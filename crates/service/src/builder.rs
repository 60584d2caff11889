use std::sync::Arc;

use depot_blob::BlobStore;
use depot_core::{DEFAULT_URL_PREFIX, UploadPolicy};
use depot_index::{InMemoryStats, MetadataIndex, StatsStore};

use crate::error::ServiceError;
use crate::metrics::ServiceMetrics;
use crate::service::FileService;

/// Default size of the slices a payload is streamed to the blob store in.
pub const DEFAULT_WRITE_SLICE: usize = 64 * 1024;

/// Fluent builder for constructing a [`FileService`].
///
/// A [`BlobStore`] and a [`MetadataIndex`] must be supplied. Statistics use
/// the index's native store when it has one and in-memory grouping otherwise.
pub struct FileServiceBuilder {
    blobs: Option<Arc<dyn BlobStore>>,
    index: Option<Arc<dyn MetadataIndex>>,
    stats: Option<Arc<dyn StatsStore>>,
    policy: UploadPolicy,
    url_prefix: String,
    write_slice: usize,
    metrics: Option<Arc<ServiceMetrics>>,
}

impl FileServiceBuilder {
    /// Create a new builder with default limits and URL prefix.
    pub fn new() -> Self {
        Self {
            blobs: None,
            index: None,
            stats: None,
            policy: UploadPolicy::default(),
            url_prefix: DEFAULT_URL_PREFIX.to_owned(),
            write_slice: DEFAULT_WRITE_SLICE,
            metrics: None,
        }
    }

    /// Set the blob store.
    #[must_use]
    pub fn blobs(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(store);
        self
    }

    /// Set the metadata index.
    #[must_use]
    pub fn index(mut self, index: Arc<dyn MetadataIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Override the statistics store.
    #[must_use]
    pub fn stats(mut self, stats: Arc<dyn StatsStore>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Set the upload limits.
    #[must_use]
    pub fn policy(mut self, policy: UploadPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the prefix used to derive download and view URLs.
    #[must_use]
    pub fn url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = prefix.into();
        self
    }

    /// Set the slice size used when streaming payloads into the blob store.
    #[must_use]
    pub fn write_slice(mut self, bytes: usize) -> Self {
        self.write_slice = bytes.max(1);
        self
    }

    /// Share an existing metrics registry.
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<ServiceMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Consume the builder and produce a [`FileService`].
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Configuration`] if a required store is missing.
    pub fn build(self) -> Result<FileService, ServiceError> {
        let blobs = self
            .blobs
            .ok_or_else(|| ServiceError::Configuration("blob store is required".into()))?;

        let index = self
            .index
            .ok_or_else(|| ServiceError::Configuration("metadata index is required".into()))?;

        let stats: Arc<dyn StatsStore> = match self.stats.or_else(|| index.stats()) {
            Some(stats) => stats,
            None => Arc::new(InMemoryStats::new(Arc::clone(&index))),
        };

        Ok(FileService {
            blobs,
            index,
            stats,
            policy: Arc::new(self.policy),
            metrics: self.metrics.unwrap_or_default(),
            url_prefix: Arc::from(self.url_prefix.trim_end_matches('/')),
            write_slice: self.write_slice,
        })
    }
}

impl Default for FileServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use depot_blob_memory::MemoryBlobStore;
    use depot_index_memory::MemoryIndex;

    use super::*;

    #[test]
    fn missing_stores_are_configuration_errors() {
        let err = FileServiceBuilder::new().build().err().unwrap();
        assert!(matches!(err, ServiceError::Configuration(ref m) if m.contains("blob")));

        let err = FileServiceBuilder::new()
            .blobs(Arc::new(MemoryBlobStore::new()))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, ServiceError::Configuration(ref m) if m.contains("index")));
    }

    #[test]
    fn prefix_is_normalised() {
        let svc = FileServiceBuilder::new()
            .blobs(Arc::new(MemoryBlobStore::new()))
            .index(Arc::new(MemoryIndex::new()))
            .url_prefix("/files/")
            .build()
            .unwrap();
        assert_eq!(svc.url_prefix(), "/files");
    }
}

use std::sync::Arc;

use tracing::{info, warn};

use depot_blob::BlobStore;
use depot_core::{FilePage, FileQuery, FileRecord, FileStats, UploadPolicy};
use depot_index::{MetadataIndex, StatsStore};

use crate::error::ServiceError;
use crate::metrics::ServiceMetrics;

/// Coordinates the blob store and the metadata index.
///
/// Cheap to clone; every clone shares the same stores and metrics.
#[derive(Clone)]
pub struct FileService {
    pub(crate) blobs: Arc<dyn BlobStore>,
    pub(crate) index: Arc<dyn MetadataIndex>,
    pub(crate) stats: Arc<dyn StatsStore>,
    pub(crate) policy: Arc<UploadPolicy>,
    pub(crate) metrics: Arc<ServiceMetrics>,
    pub(crate) url_prefix: Arc<str>,
    pub(crate) write_slice: usize,
}

impl FileService {
    /// The upload limits in force.
    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Outcome counters.
    pub fn metrics(&self) -> &ServiceMetrics {
        &self.metrics
    }

    /// Prefix used to derive download and view URLs.
    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    /// The record for `filename`.
    pub async fn metadata(&self, filename: &str) -> Result<FileRecord, ServiceError> {
        self.index
            .get(filename)
            .await?
            .ok_or_else(|| ServiceError::NotFound(filename.to_owned()))
    }

    /// A page of records matching `query`.
    pub async fn list(&self, query: &FileQuery) -> Result<FilePage, ServiceError> {
        Ok(self.index.query(query).await?)
    }

    /// Delete a file's blob and then its record.
    ///
    /// A record whose blob is already gone is still removed. Fails with
    /// [`ServiceError::NotFound`] only when neither exists.
    pub async fn delete(&self, filename: &str) -> Result<(), ServiceError> {
        let blob = self.blobs.find_by_name(filename).await?;
        let record = self.index.get(filename).await?;
        if blob.is_none() && record.is_none() {
            return Err(ServiceError::NotFound(filename.to_owned()));
        }

        let mut blob_ids: Vec<&str> = Vec::with_capacity(2);
        if let Some(ref b) = blob {
            blob_ids.push(&b.id);
        }
        if let Some(ref r) = record
            && !blob_ids.contains(&r.blob_id.as_str())
        {
            blob_ids.push(&r.blob_id);
        }
        for id in blob_ids {
            if !self.blobs.delete(id).await? {
                warn!(filename, blob_id = id, "blob already missing during delete");
            }
        }

        self.index.delete(filename).await?;
        self.metrics.increment_deletions();
        info!(filename, "file deleted");
        Ok(())
    }

    /// Totals, per-type breakdown and the `top_n` most downloaded files.
    pub async fn stats(&self, top_n: usize) -> Result<FileStats, ServiceError> {
        Ok(self.stats.file_stats(top_n).await?)
    }

    /// Close both stores.
    pub async fn shutdown(&self) -> Result<(), ServiceError> {
        self.blobs.close().await?;
        self.index.close().await?;
        info!("file service stores closed");
        Ok(())
    }
}

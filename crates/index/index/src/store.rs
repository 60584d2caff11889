use std::sync::Arc;

use async_trait::async_trait;

use depot_core::{FilePage, FileQuery, FileRecord};

use crate::error::IndexError;
use crate::stats::StatsStore;

/// Trait for file metadata storage backends.
///
/// Records are keyed by their generated file name. Implementations must be
/// `Send + Sync` to be shared across async tasks.
#[async_trait]
pub trait MetadataIndex: Send + Sync {
    /// Persist a new record.
    async fn insert(&self, record: FileRecord) -> Result<(), IndexError>;

    /// Fetch a record by generated name.
    async fn get(&self, filename: &str) -> Result<Option<FileRecord>, IndexError>;

    /// Remove a record. Returns `false` if it did not exist.
    async fn delete(&self, filename: &str) -> Result<bool, IndexError>;

    /// Atomically bump the download counter, returning the new value, or
    /// `None` if no such record exists.
    async fn increment_downloads(&self, filename: &str) -> Result<Option<u64>, IndexError>;

    /// Query records with filters, ordering and pagination.
    async fn query(&self, query: &FileQuery) -> Result<FilePage, IndexError>;

    /// Return a native statistics store if the backend supports one.
    ///
    /// The default returns `None`, causing the caller to fall back to
    /// [`InMemoryStats`](crate::stats::InMemoryStats).
    fn stats(&self) -> Option<Arc<dyn StatsStore>> {
        None
    }

    /// Release backend resources.
    async fn close(&self) -> Result<(), IndexError> {
        Ok(())
    }
}

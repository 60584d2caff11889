use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;

use depot_blob::{BlobError, BlobInfo, BlobStore, BlobWriter, ByteStream};
use depot_blob_memory::MemoryBlobStore;
use depot_core::{FilePage, FileQuery, FileRecord};
use depot_index::{IndexError, MetadataIndex};
use depot_index_memory::MemoryIndex;

use crate::builder::FileServiceBuilder;
use crate::service::FileService;
use crate::upload::FileUpload;

pub(crate) fn memory_service() -> (FileService, Arc<MemoryBlobStore>, Arc<MemoryIndex>) {
    let blobs = Arc::new(MemoryBlobStore::with_chunk_size(1024));
    let index = Arc::new(MemoryIndex::new());
    let svc = FileServiceBuilder::new()
        .blobs(blobs.clone())
        .index(index.clone())
        .write_slice(700)
        .build()
        .unwrap();
    (svc, blobs, index)
}

pub(crate) fn png(name: &str, size: usize) -> FileUpload {
    #[allow(clippy::cast_possible_truncation)]
    let data: Vec<u8> = (0..size).map(|i| (i % 256) as u8).collect();
    FileUpload::new(name, "image/png", Bytes::from(data))
}

/// Index whose inserts or counter updates fail on demand.
#[derive(Default)]
pub(crate) struct FlakyIndex {
    pub inner: MemoryIndex,
    pub fail_inserts: AtomicBool,
    pub fail_increments: AtomicBool,
    pub closed: AtomicBool,
}

#[async_trait]
impl MetadataIndex for FlakyIndex {
    async fn insert(&self, record: FileRecord) -> Result<(), IndexError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(IndexError::Storage("insert refused".into()));
        }
        self.inner.insert(record).await
    }

    async fn get(&self, filename: &str) -> Result<Option<FileRecord>, IndexError> {
        self.inner.get(filename).await
    }

    async fn delete(&self, filename: &str) -> Result<bool, IndexError> {
        self.inner.delete(filename).await
    }

    async fn increment_downloads(&self, filename: &str) -> Result<Option<u64>, IndexError> {
        if self.fail_increments.load(Ordering::SeqCst) {
            return Err(IndexError::Storage("increment refused".into()));
        }
        self.inner.increment_downloads(filename).await
    }

    async fn query(&self, query: &FileQuery) -> Result<FilePage, IndexError> {
        self.inner.query(query).await
    }

    async fn close(&self) -> Result<(), IndexError> {
        self.closed.store(true, Ordering::SeqCst);
        self.inner.close().await
    }
}

/// Blob store whose writes or deletes fail on demand.
#[derive(Default)]
pub(crate) struct FlakyBlobs {
    pub inner: MemoryBlobStore,
    pub fail_writes: AtomicBool,
    pub fail_deletes: AtomicBool,
    pub closed: AtomicBool,
}

struct FlakyWriter {
    inner: Box<dyn BlobWriter>,
    fail: bool,
}

#[async_trait]
impl BlobWriter for FlakyWriter {
    fn id(&self) -> &str {
        self.inner.id()
    }

    async fn write(&mut self, data: Bytes) -> Result<(), BlobError> {
        if self.fail {
            return Err(BlobError::Storage("disk full".into()));
        }
        self.inner.write(data).await
    }

    async fn finish(self: Box<Self>) -> Result<BlobInfo, BlobError> {
        self.inner.finish().await
    }

    async fn abort(self: Box<Self>) -> Result<(), BlobError> {
        self.inner.abort().await
    }
}

#[async_trait]
impl BlobStore for FlakyBlobs {
    async fn begin_write(
        &self,
        name: &str,
        content_type: &str,
    ) -> Result<Box<dyn BlobWriter>, BlobError> {
        Ok(Box::new(FlakyWriter {
            inner: self.inner.begin_write(name, content_type).await?,
            fail: self.fail_writes.load(Ordering::SeqCst),
        }))
    }

    async fn open_read(&self, id: &str) -> Result<ByteStream, BlobError> {
        self.inner.open_read(id).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<BlobInfo>, BlobError> {
        self.inner.find_by_name(name).await
    }

    async fn stat(&self, id: &str) -> Result<Option<BlobInfo>, BlobError> {
        self.inner.stat(id).await
    }

    async fn delete(&self, id: &str) -> Result<bool, BlobError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(BlobError::Storage("delete refused".into()));
        }
        self.inner.delete(id).await
    }

    async fn close(&self) -> Result<(), BlobError> {
        self.closed.store(true, Ordering::SeqCst);
        self.inner.close().await
    }
}

pub(crate) fn flaky_service() -> (FileService, Arc<FlakyBlobs>, Arc<FlakyIndex>) {
    let blobs = Arc::new(FlakyBlobs::default());
    let index = Arc::new(FlakyIndex::default());
    let svc = FileServiceBuilder::new()
        .blobs(blobs.clone())
        .index(index.clone())
        .build()
        .unwrap();
    (svc, blobs, index)
}

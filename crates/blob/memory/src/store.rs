use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use futures::stream;

use depot_blob::{
    BlobError, BlobInfo, BlobStore, BlobWriter, ByteStream, Chunker, DEFAULT_CHUNK_SIZE,
};

struct StoredBlob {
    info: BlobInfo,
    chunks: Vec<Bytes>,
    seq: u64,
}

#[derive(Default)]
struct Inner {
    blobs: DashMap<String, Arc<StoredBlob>>,
    next_seq: AtomicU64,
}

/// In-memory blob store backed by a concurrent hash map.
///
/// Staged chunks live inside the writer and only reach the map on
/// [`BlobWriter::finish`], so an abandoned write leaves nothing behind.
/// Suitable for tests and single-process deployments.
#[derive(Clone)]
pub struct MemoryBlobStore {
    inner: Arc<Inner>,
    chunk_size: usize,
}

impl MemoryBlobStore {
    /// Create a store with the default chunk size.
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Create a store that splits content into chunks of `chunk_size` bytes.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            inner: Arc::new(Inner::default()),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Number of committed blobs.
    pub fn len(&self) -> usize {
        self.inner.blobs.len()
    }

    /// Whether the store holds no committed blobs.
    pub fn is_empty(&self) -> bool {
        self.inner.blobs.is_empty()
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn begin_write(
        &self,
        name: &str,
        content_type: &str,
    ) -> Result<Box<dyn BlobWriter>, BlobError> {
        Ok(Box::new(MemoryBlobWriter {
            inner: Arc::clone(&self.inner),
            id: uuid::Uuid::now_v7().to_string(),
            name: name.to_owned(),
            content_type: content_type.to_owned(),
            chunker: Chunker::new(self.chunk_size),
            chunks: Vec::new(),
        }))
    }

    async fn open_read(&self, id: &str) -> Result<ByteStream, BlobError> {
        let blob = self
            .inner
            .blobs
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| BlobError::NotFound(id.to_owned()))?;

        let count = blob.chunks.len();
        Ok(Box::pin(stream::iter(
            (0..count).map(move |i| Ok(blob.chunks[i].clone())),
        )))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<BlobInfo>, BlobError> {
        Ok(self
            .inner
            .blobs
            .iter()
            .filter(|entry| entry.info.name == name)
            .min_by_key(|entry| entry.seq)
            .map(|entry| entry.info.clone()))
    }

    async fn stat(&self, id: &str) -> Result<Option<BlobInfo>, BlobError> {
        Ok(self.inner.blobs.get(id).map(|entry| entry.info.clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool, BlobError> {
        Ok(self.inner.blobs.remove(id).is_some())
    }
}

struct MemoryBlobWriter {
    inner: Arc<Inner>,
    id: String,
    name: String,
    content_type: String,
    chunker: Chunker,
    chunks: Vec<Bytes>,
}

#[async_trait]
impl BlobWriter for MemoryBlobWriter {
    fn id(&self) -> &str {
        &self.id
    }

    async fn write(&mut self, data: Bytes) -> Result<(), BlobError> {
        let ready = self.chunker.push(&data);
        self.chunks.extend(ready);
        Ok(())
    }

    async fn finish(self: Box<Self>) -> Result<BlobInfo, BlobError> {
        let Self {
            inner,
            id,
            name,
            content_type,
            chunker,
            mut chunks,
        } = *self;

        #[allow(clippy::cast_possible_truncation)]
        let chunk_size = chunker.chunk_size() as u32;
        let (tail, summary) = chunker.finish();
        chunks.extend(tail);

        let info = BlobInfo {
            id: id.clone(),
            name,
            content_type,
            length: summary.length,
            chunk_size,
            chunk_count: summary.chunk_count,
            checksum_sha256: summary.checksum_sha256,
            uploaded_at: Utc::now(),
        };
        let seq = inner.next_seq.fetch_add(1, Ordering::Relaxed);
        inner.blobs.insert(
            id,
            Arc::new(StoredBlob {
                info: info.clone(),
                chunks,
                seq,
            }),
        );
        Ok(info)
    }

    async fn abort(self: Box<Self>) -> Result<(), BlobError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use depot_blob::collect_bytes;
    use depot_blob::testing::run_blob_store_conformance_tests;

    use super::*;

    #[tokio::test]
    async fn conformance() {
        let store = MemoryBlobStore::new();
        run_blob_store_conformance_tests(&store)
            .await
            .expect("conformance tests should pass");
    }

    #[tokio::test]
    async fn conformance_with_tiny_chunks() {
        let store = MemoryBlobStore::with_chunk_size(1000);
        run_blob_store_conformance_tests(&store)
            .await
            .expect("conformance tests should pass");
    }

    #[tokio::test]
    async fn find_by_name_returns_earliest() {
        let store = MemoryBlobStore::new();
        let mut ids = Vec::new();
        for body in ["first", "second", "third"] {
            let mut w = store.begin_write("same.txt", "text/plain").await.unwrap();
            w.write(Bytes::from(body)).await.unwrap();
            ids.push(w.finish().await.unwrap().id);
        }
        let found = store.find_by_name("same.txt").await.unwrap().unwrap();
        assert_eq!(found.id, ids[0]);

        let body = collect_bytes(store.open_read(&found.id).await.unwrap())
            .await
            .unwrap();
        assert_eq!(body, Bytes::from_static(b"first"));
    }

    #[tokio::test]
    async fn chunking_respects_chunk_size() {
        let store = MemoryBlobStore::with_chunk_size(4);
        let mut w = store.begin_write("c.bin", "application/zip").await.unwrap();
        w.write(Bytes::from_static(b"0123456789")).await.unwrap();
        let info = w.finish().await.unwrap();
        assert_eq!(info.chunk_size, 4);
        assert_eq!(info.chunk_count, 3);
        assert_eq!(store.len(), 1);
    }
}

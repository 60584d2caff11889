use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use futures::stream::BoxStream;

use crate::error::BlobError;
use crate::types::BlobInfo;

/// Lazily produced blob content, one chunk per item.
pub type ByteStream = BoxStream<'static, Result<Bytes, BlobError>>;

/// An in-progress blob write.
///
/// Nothing written through a writer is visible to readers until
/// [`BlobWriter::finish`] succeeds. Dropping a writer without finishing it
/// discards the staged data.
#[async_trait]
pub trait BlobWriter: Send {
    /// Identifier the blob will carry once committed.
    fn id(&self) -> &str;

    /// Append bytes to the staged blob.
    async fn write(&mut self, data: Bytes) -> Result<(), BlobError>;

    /// Commit the staged blob and return its descriptor.
    async fn finish(self: Box<Self>) -> Result<BlobInfo, BlobError>;

    /// Discard everything staged so far.
    async fn abort(self: Box<Self>) -> Result<(), BlobError>;
}

/// Chunked storage for opaque file contents.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Open a writer for a new blob.
    async fn begin_write(
        &self,
        name: &str,
        content_type: &str,
    ) -> Result<Box<dyn BlobWriter>, BlobError>;

    /// Stream a committed blob. Fails with [`BlobError::NotFound`] if absent.
    async fn open_read(&self, id: &str) -> Result<ByteStream, BlobError>;

    /// Return the earliest committed blob written under `name`.
    async fn find_by_name(&self, name: &str) -> Result<Option<BlobInfo>, BlobError>;

    /// Look up a committed blob by id.
    async fn stat(&self, id: &str) -> Result<Option<BlobInfo>, BlobError>;

    /// Remove a blob. Returns `false` if it did not exist.
    async fn delete(&self, id: &str) -> Result<bool, BlobError>;

    /// Release backend resources.
    async fn close(&self) -> Result<(), BlobError> {
        Ok(())
    }
}

/// Drain a byte stream into a single buffer.
pub async fn collect_bytes(mut stream: ByteStream) -> Result<Bytes, BlobError> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}

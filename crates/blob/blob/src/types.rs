use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default chunk size in bytes (255 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 255 * 1024;

/// Descriptor of a committed blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobInfo {
    /// Store-assigned identifier.
    pub id: String,
    /// Logical name the blob was written under.
    pub name: String,
    /// MIME content type (e.g. `"application/pdf"`).
    pub content_type: String,
    /// Size in bytes.
    pub length: u64,
    /// Chunk size used when the blob was written.
    pub chunk_size: u32,
    /// Number of stored chunks.
    pub chunk_count: u32,
    /// `SHA-256` hex digest of the content.
    pub checksum_sha256: String,
    /// When the blob was committed.
    pub uploaded_at: DateTime<Utc>,
}

use thiserror::Error;

/// Errors that can occur during blob storage operations.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The requested blob was not found.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// The blob identifier is malformed for this backend.
    #[error("invalid blob id: {0}")]
    InvalidId(String),

    /// A storage backend error occurred.
    #[error("blob storage error: {0}")]
    Storage(String),

    /// An I/O error from a file-backed store.
    #[error("blob io error: {0}")]
    Io(#[from] std::io::Error),
}

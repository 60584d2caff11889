/// Errors that can occur during metadata index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// An error from the underlying storage backend.
    #[error("storage error: {0}")]
    Storage(String),

    /// A record with the same generated name is already indexed.
    #[error("duplicate file name: {0}")]
    Duplicate(String),

    /// A stored row could not be mapped back to a record.
    #[error("serialization error: {0}")]
    Serialization(String),
}

use thiserror::Error;

use depot_core::PolicyViolation;

/// Errors that can occur in file service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request was rejected before any store was touched.
    #[error("{0}")]
    Validation(String),

    /// No file exists under the requested name.
    #[error("File not found")]
    NotFound(String),

    /// The file exists but its type may not be served inline.
    #[error("This file type cannot be viewed inline. Please download it instead.")]
    NotInlineable(String),

    /// An error occurred in the blob store.
    #[error("blob store error: {0}")]
    Blob(#[from] depot_blob::BlobError),

    /// An error occurred in the metadata index.
    #[error("index error: {0}")]
    Index(#[from] depot_index::IndexError),

    /// The service was misconfigured (e.g. missing required components).
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<PolicyViolation> for ServiceError {
    fn from(violation: PolicyViolation) -> Self {
        Self::Validation(violation.to_string())
    }
}

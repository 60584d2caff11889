pub mod builder;
pub mod error;
pub mod metrics;
pub mod retrieval;
pub mod service;
pub mod upload;

#[cfg(test)]
mod test_support;

pub use builder::FileServiceBuilder;
pub use error::ServiceError;
pub use metrics::{MetricsSnapshot, ServiceMetrics};
pub use retrieval::{Disposition, FileDownload};
pub use service::FileService;
pub use upload::{
    BatchUploadReport, FileUpload, UploadFailure, UploadOptions, UploadState, UploadedFile,
};

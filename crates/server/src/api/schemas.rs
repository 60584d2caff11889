use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use depot_core::{FileRecord, FileStats};
use depot_service::{MetricsSnapshot, UploadFailure, UploadedFile};

/// Error body returned for every failed request.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `false`.
    pub success: bool,
    /// Human-readable reason.
    #[schema(example = "File not found")]
    pub message: String,
    /// Underlying error detail, for server-side failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body carrying only a confirmation message.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    /// Always `true`.
    pub success: bool,
    /// Confirmation text.
    #[schema(example = "File deleted successfully")]
    pub message: String,
}

/// A stored file and the URLs it can be fetched from.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    /// The stored record.
    #[serde(flatten)]
    pub record: FileRecord,
    /// Attachment URL.
    #[schema(example = "/api/files/download/1718000000000-9f86d081884c7d65.png")]
    pub download_url: String,
    /// Inline URL.
    #[schema(example = "/api/files/view/1718000000000-9f86d081884c7d65.png")]
    pub view_url: String,
}

impl From<UploadedFile> for FileData {
    fn from(uploaded: UploadedFile) -> Self {
        Self {
            record: uploaded.record,
            download_url: uploaded.download_url,
            view_url: uploaded.view_url,
        }
    }
}

/// Response to a single-file upload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    /// Always `true`.
    pub success: bool,
    /// Confirmation text.
    #[schema(example = "File uploaded successfully")]
    pub message: String,
    /// The stored file.
    pub data: FileData,
}

/// A file in a multi-file upload that was not stored.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FailedUpload {
    /// Name supplied by the client.
    #[serde(rename = "originalname")]
    pub original_name: String,
    /// Why it was not stored.
    #[schema(example = "File size too large. Maximum size is 10MB")]
    pub error: String,
}

impl From<UploadFailure> for FailedUpload {
    fn from(failure: UploadFailure) -> Self {
        Self {
            original_name: failure.original_name,
            error: failure.reason,
        }
    }
}

/// Per-file outcomes of a multi-file upload, in request order.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchUploadData {
    /// Files that were stored.
    pub successful: Vec<FileData>,
    /// Files that were not.
    pub failed: Vec<FailedUpload>,
}

/// Response to a multi-file upload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchUploadResponse {
    /// `true` even when some files failed.
    pub success: bool,
    /// Summary of the outcome.
    #[schema(example = "Uploaded 2 file(s) successfully, 1 failed")]
    pub message: String,
    /// Per-file outcomes.
    pub data: BatchUploadData,
}

/// Query parameters for listing files.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListFilesParams {
    /// 1-based page number (default 1).
    pub page: Option<u32>,
    /// Page size (default 20, max 1000).
    pub limit: Option<u32>,
    /// Case-insensitive substring of the name, original name or description.
    pub search: Option<String>,
    /// Exact MIME type.
    pub mimetype: Option<String>,
    /// Exact extension.
    pub extension: Option<String>,
    /// Exact uploader.
    pub uploader: Option<String>,
    /// Exact tag.
    pub tag: Option<String>,
    /// Field to sort by (default `uploadedAt`).
    pub sort_by: Option<String>,
    /// `asc` or `desc` (default `desc`).
    pub sort_order: Option<String>,
}

/// A page of public files.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesResponse {
    /// Always `true`.
    pub success: bool,
    /// Records on this page.
    pub count: usize,
    /// Records matching the filters.
    pub total: u64,
    /// Pages at the requested page size.
    pub total_pages: u64,
    /// The page returned.
    pub current_page: u32,
    /// The records.
    pub data: Vec<FileRecord>,
}

/// A single file's record.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MetadataResponse {
    /// Always `true`.
    pub success: bool,
    /// The record.
    pub data: FileRecord,
}

/// Aggregate statistics over every stored file.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatsResponse {
    /// Always `true`.
    pub success: bool,
    /// Totals, per-type breakdown and most downloaded files.
    pub data: FileStats,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status indicator.
    #[schema(example = "ok")]
    pub status: String,
    /// Current service counters.
    pub metrics: MetricsSnapshot,
}

/// Multipart body for a single-file upload.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SingleUploadForm {
    /// The file.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// Free-text description (max 500 characters).
    pub description: Option<String>,
    /// Comma-separated tags.
    pub tags: Option<String>,
    /// Anything but `"false"` makes the file public.
    pub is_public: Option<String>,
    /// Owner reference.
    pub uploader: Option<String>,
}

/// Multipart body for a multi-file upload.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MultiUploadForm {
    /// The files (at most 5).
    #[schema(value_type = Vec<String>)]
    pub files: Vec<Vec<u8>>,
    /// Free-text description applied to every file.
    pub description: Option<String>,
    /// Comma-separated tags applied to every file.
    pub tags: Option<String>,
    /// Anything but `"false"` makes the files public.
    pub is_public: Option<String>,
    /// Owner reference.
    pub uploader: Option<String>,
}

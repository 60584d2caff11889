use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::size::format_file_size;

/// Default route prefix under which files are served.
pub const DEFAULT_URL_PREFIX: &str = "/api/files";

/// Descriptive record for a stored file.
///
/// A record is created only after its blob has been committed and is keyed by
/// the generated `filename`, which is unique across the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Record identifier (UUID v7).
    pub id: String,
    /// Generated unique name (`<millis>-<hex>.<ext>`).
    pub filename: String,
    /// Name supplied by the uploader.
    #[serde(rename = "originalname")]
    pub original_name: String,
    /// MIME type of the content.
    pub mimetype: String,
    /// Size in bytes.
    pub size: u64,
    /// Human-readable size (e.g. `"488.28 KB"`).
    pub size_formatted: String,
    /// Lowercased extension of the original name.
    pub extension: String,
    /// Logical storage path (`uploads/<filename>`).
    pub path: String,
    /// Owner reference.
    pub uploader: String,
    /// Optional free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tags attached at upload time.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Whether the file appears in public listings.
    pub is_public: bool,
    /// Number of downloads and inline views served.
    #[serde(default)]
    pub download_count: u64,
    /// When the record was created.
    pub uploaded_at: DateTime<Utc>,
    /// Identifier of the backing blob.
    pub blob_id: String,
}

impl FileRecord {
    /// Build a record for a freshly committed blob.
    ///
    /// The download counter starts at zero and the creation time is now.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        filename: impl Into<String>,
        original_name: impl Into<String>,
        mimetype: impl Into<String>,
        size: u64,
        extension: impl Into<String>,
        uploader: impl Into<String>,
        blob_id: impl Into<String>,
    ) -> Self {
        let filename = filename.into();
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            path: format!("uploads/{filename}"),
            filename,
            original_name: original_name.into(),
            mimetype: mimetype.into(),
            size,
            size_formatted: format_file_size(size),
            extension: extension.into(),
            uploader: uploader.into(),
            description: None,
            tags: Vec::new(),
            is_public: true,
            download_count: 0,
            uploaded_at: Utc::now(),
            blob_id: blob_id.into(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Set the tags.
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Set the visibility flag.
    #[must_use]
    pub fn with_public(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }

    /// URL that serves the file as an attachment.
    pub fn download_url(&self, prefix: &str) -> String {
        format!("{}/download/{}", prefix.trim_end_matches('/'), self.filename)
    }

    /// URL that serves the file inline.
    pub fn view_url(&self, prefix: &str) -> String {
        format!("{}/view/{}", prefix.trim_end_matches('/'), self.filename)
    }
}

/// Split a comma-separated tag list into trimmed, non-empty tags.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

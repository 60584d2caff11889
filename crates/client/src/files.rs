use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use depot_core::{FileRecord, FileStats, SortField, SortOrder};

use crate::{DepotClient, Error};

/// A file to send.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Name reported to the server.
    pub name: String,
    /// Content type reported to the server.
    pub content_type: String,
    /// The payload.
    pub data: Bytes,
}

impl UploadFile {
    /// Create a file to upload.
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }
}

/// Text fields sent alongside uploaded files.
#[derive(Debug, Clone, Default)]
pub struct UploadFields {
    /// Free-text description.
    pub description: Option<String>,
    /// Tags.
    pub tags: Vec<String>,
    /// `Some(false)` makes the files private.
    pub is_public: Option<bool>,
    /// Owner reference; the server's default is used when absent.
    pub uploader: Option<String>,
}

impl UploadFields {
    fn apply(&self, mut form: Form) -> Form {
        if let Some(ref description) = self.description {
            form = form.text("description", description.clone());
        }
        if !self.tags.is_empty() {
            form = form.text("tags", self.tags.join(","));
        }
        if let Some(is_public) = self.is_public {
            form = form.text("isPublic", is_public.to_string());
        }
        if let Some(ref uploader) = self.uploader {
            form = form.text("uploader", uploader.clone());
        }
        form
    }
}

/// A stored file and the URLs it can be fetched from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    /// The stored record.
    #[serde(flatten)]
    pub record: FileRecord,
    /// Attachment URL.
    pub download_url: String,
    /// Inline URL.
    pub view_url: String,
}

/// A file in a multi-file upload that was not stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedUpload {
    /// Name sent by the client.
    #[serde(rename = "originalname")]
    pub original_name: String,
    /// Why it was not stored.
    pub error: String,
}

/// Per-file outcomes of a multi-file upload, in request order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchUpload {
    /// Files that were stored.
    pub successful: Vec<UploadedFile>,
    /// Files that were not.
    #[serde(default)]
    pub failed: Vec<FailedUpload>,
}

/// Filters, ordering and paging for [`DepotClient::list_files`].
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesQuery {
    /// 1-based page number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Page size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Case-insensitive substring of the name, original name or description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Exact MIME type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
    /// Exact extension.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    /// Exact uploader.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader: Option<String>,
    /// Exact tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Field to sort by.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortField>,
    /// Sort direction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
}

/// A page of public files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
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

/// A fully read download.
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    /// `Content-Type` sent by the server.
    pub content_type: Option<String>,
    /// `Content-Disposition` sent by the server.
    pub content_disposition: Option<String>,
    /// The content.
    pub data: Bytes,
}

/// A download being received chunk by chunk.
pub struct FileStream {
    /// `Content-Type` sent by the server.
    pub content_type: Option<String>,
    /// `Content-Length` sent by the server.
    pub content_length: Option<u64>,
    /// The content.
    pub stream: BoxStream<'static, Result<Bytes, Error>>,
}

impl std::fmt::Debug for FileStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStream")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

fn header_string(
    response: &reqwest::Response,
    name: reqwest::header::HeaderName,
) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

fn file_part(file: UploadFile) -> Result<Part, Error> {
    Part::bytes(file.data.to_vec())
        .file_name(file.name)
        .mime_str(&file.content_type)
        .map_err(|e| Error::Configuration(format!("invalid content type: {e}")))
}

impl DepotClient {
    /// Upload one file.
    pub async fn upload(
        &self,
        file: UploadFile,
        fields: &UploadFields,
    ) -> Result<UploadedFile, Error> {
        let url = format!("{}/api/files/upload", self.base_url);
        let form = fields.apply(Form::new().part("file", file_part(file)?));
        let envelope: DataEnvelope<UploadedFile> = self
            .send_json(self.client.post(&url).multipart(form))
            .await?;
        Ok(envelope.data)
    }

    /// Upload several files in one request.
    ///
    /// Per-file failures come back in [`BatchUpload::failed`]; only a
    /// rejected batch is an error.
    pub async fn upload_many(
        &self,
        files: Vec<UploadFile>,
        fields: &UploadFields,
    ) -> Result<BatchUpload, Error> {
        let url = format!("{}/api/files/upload-multiple", self.base_url);
        let mut form = Form::new();
        for file in files {
            form = form.part("files", file_part(file)?);
        }
        let envelope: DataEnvelope<BatchUpload> = self
            .send_json(self.client.post(&url).multipart(fields.apply(form)))
            .await?;
        Ok(envelope.data)
    }

    /// List public files.
    pub async fn list_files(&self, query: &ListFilesQuery) -> Result<FileList, Error> {
        let url = format!("{}/api/files", self.base_url);
        self.send_json(self.client.get(&url).query(query)).await
    }

    /// Fetch one file's record.
    pub async fn metadata(&self, filename: &str) -> Result<FileRecord, Error> {
        let url = self.file_url("metadata", filename);
        let envelope: DataEnvelope<FileRecord> = self.send_json(self.client.get(&url)).await?;
        Ok(envelope.data)
    }

    /// Download a file into memory.
    pub async fn download(&self, filename: &str) -> Result<DownloadedFile, Error> {
        self.fetch("download", filename).await
    }

    /// Download a file as a stream of chunks.
    pub async fn download_stream(&self, filename: &str) -> Result<FileStream, Error> {
        let url = self.file_url("download", filename);
        let response = self.send(self.client.get(&url)).await?;
        Ok(FileStream {
            content_type: header_string(&response, CONTENT_TYPE),
            content_length: response.content_length(),
            stream: response
                .bytes_stream()
                .map(|chunk| chunk.map_err(|e| Error::Connection(e.to_string())))
                .boxed(),
        })
    }

    /// Fetch a file for inline display.
    ///
    /// Fails with HTTP 400 for types that cannot be shown inline.
    pub async fn view(&self, filename: &str) -> Result<DownloadedFile, Error> {
        self.fetch("view", filename).await
    }

    async fn fetch(&self, route: &str, filename: &str) -> Result<DownloadedFile, Error> {
        let url = self.file_url(route, filename);
        let response = self.send(self.client.get(&url)).await?;
        let content_type = header_string(&response, CONTENT_TYPE);
        let content_disposition = header_string(&response, CONTENT_DISPOSITION);
        let data = response
            .bytes()
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        Ok(DownloadedFile {
            content_type,
            content_disposition,
            data,
        })
    }

    /// Delete a file and its record.
    pub async fn delete(&self, filename: &str) -> Result<(), Error> {
        let url = self.file_url("", filename);
        self.send(self.client.delete(&url)).await?;
        Ok(())
    }

    /// Aggregate statistics over every stored file.
    pub async fn stats(&self) -> Result<FileStats, Error> {
        let url = format!("{}/api/files/stats", self.base_url);
        let envelope: DataEnvelope<FileStats> = self.send_json(self.client.get(&url)).await?;
        Ok(envelope.data)
    }
}

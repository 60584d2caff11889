use std::fmt;
use std::fmt::Write as _;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::{debug, warn};

use depot_blob::ByteStream;
use depot_core::{FileRecord, is_inline_viewable};

use crate::error::ServiceError;
use crate::service::FileService;

/// How a served file should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Save as a file.
    Attachment,
    /// Display in the browser.
    Inline,
}

impl Disposition {
    /// Header keyword.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Attachment => "attachment",
            Self::Inline => "inline",
        }
    }
}

/// A file ready to be streamed to a client.
pub struct FileDownload {
    /// The record the content belongs to.
    pub record: FileRecord,
    /// Content type to serve.
    pub content_type: String,
    /// Exact length of `stream` in bytes.
    pub content_length: u64,
    /// Attachment or inline.
    pub disposition: Disposition,
    /// The content, chunk by chunk.
    pub stream: ByteStream,
}

impl fmt::Debug for FileDownload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileDownload")
            .field("filename", &self.record.filename)
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("disposition", &self.disposition)
            .finish_non_exhaustive()
    }
}

impl FileDownload {
    /// `Content-Disposition` header value carrying the original name.
    ///
    /// Non-ASCII names get an RFC 5987 `filename*` parameter alongside an
    /// ASCII fallback.
    pub fn content_disposition(&self) -> String {
        let name = &self.record.original_name;
        let fallback: String = name
            .chars()
            .map(|c| match c {
                '"' | '\\' => '_',
                c if c.is_ascii() && !c.is_ascii_control() => c,
                _ => '_',
            })
            .collect();
        let mut value = format!("{}; filename=\"{fallback}\"", self.disposition.as_str());
        if !name.is_ascii() {
            let _ = write!(
                value,
                "; filename*=UTF-8''{}",
                utf8_percent_encode(name, ATTR_CHAR)
            );
        }
        value
    }
}

/// Bytes left unescaped in an RFC 5987 `filename*` value.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

impl FileService {
    /// Serve a file as an attachment and count the download.
    pub async fn download(&self, filename: &str) -> Result<FileDownload, ServiceError> {
        let served = self.open(filename, Disposition::Attachment).await?;
        self.metrics.increment_downloads();
        Ok(served)
    }

    /// Serve a file inline. Only images, PDF and plain text qualify.
    pub async fn view(&self, filename: &str) -> Result<FileDownload, ServiceError> {
        let served = self.open(filename, Disposition::Inline).await?;
        self.metrics.increment_views();
        Ok(served)
    }

    async fn open(
        &self,
        filename: &str,
        disposition: Disposition,
    ) -> Result<FileDownload, ServiceError> {
        let not_found = || ServiceError::NotFound(filename.to_owned());
        let record = self.index.get(filename).await?.ok_or_else(not_found)?;
        let blob = self.blobs.stat(&record.blob_id).await?.ok_or_else(not_found)?;

        if disposition == Disposition::Inline && !is_inline_viewable(&record.mimetype) {
            return Err(ServiceError::NotInlineable(record.mimetype));
        }

        let stream = self.blobs.open_read(&blob.id).await.map_err(|e| match e {
            depot_blob::BlobError::NotFound(_) => not_found(),
            other => ServiceError::Blob(other),
        })?;

        // Counted once the stream is open, before any byte is sent.
        match self.index.increment_downloads(filename).await {
            Ok(Some(count)) => debug!(filename, count, "download counted"),
            Ok(None) => {
                self.metrics.increment_counter_failures();
                warn!(filename, "record vanished before download could be counted");
            }
            Err(e) => {
                self.metrics.increment_counter_failures();
                warn!(filename, error = %e, "failed to update download counter");
            }
        }

        Ok(FileDownload {
            content_type: record.mimetype.clone(),
            content_length: blob.length,
            disposition,
            stream,
            record,
        })
    }
}

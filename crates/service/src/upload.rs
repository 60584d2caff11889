use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use depot_blob::{BlobError, BlobInfo};
use depot_core::{FileRecord, generate_unique_filename, mime_for_extension};

use crate::error::ServiceError;
use crate::service::FileService;

/// One file received for upload.
#[derive(Debug, Clone)]
pub struct FileUpload {
    /// Name supplied by the client.
    pub original_name: String,
    /// Content type supplied by the client (may be empty).
    pub content_type: String,
    /// The payload.
    pub data: Bytes,
}

impl FileUpload {
    /// Create an upload.
    pub fn new(
        original_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            original_name: original_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }
}

/// Record attributes supplied alongside the payload.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Owner reference.
    pub uploader: String,
    /// Optional description.
    pub description: Option<String>,
    /// Tags.
    pub tags: Vec<String>,
    /// Whether the file appears in public listings.
    pub is_public: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            uploader: "anonymous".to_owned(),
            description: None,
            tags: Vec::new(),
            is_public: true,
        }
    }
}

/// A committed upload and its derived URLs.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// The stored record.
    pub record: FileRecord,
    /// Attachment URL.
    pub download_url: String,
    /// Inline URL.
    pub view_url: String,
}

/// A file in a batch that was not stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    /// Name supplied by the client.
    pub original_name: String,
    /// Why it failed.
    pub reason: String,
}

/// Outcome of a multi-file upload, each list in input order.
#[derive(Debug, Clone, Default)]
pub struct BatchUploadReport {
    /// Files that were stored.
    pub successful: Vec<UploadedFile>,
    /// Files that were not.
    pub failed: Vec<UploadFailure>,
}

/// Per-file upload progress.
///
/// `Init → Validating → WritingBlob → BlobCommitted → WritingMetadata →
/// Committed`, with `Rejected` after a failed validation and `Aborted` after
/// a failed write (through `Compensating` when the record write failed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    /// Received, nothing checked yet.
    Init,
    /// Checking type, size and description against the policy.
    Validating,
    /// Refused by the policy; nothing was written.
    Rejected,
    /// Streaming the payload into the blob store.
    WritingBlob,
    /// The blob is committed; no record exists yet.
    BlobCommitted,
    /// Inserting the metadata record.
    WritingMetadata,
    /// Deleting the committed blob after the record write failed.
    Compensating,
    /// Failed after validation; the blob was discarded or orphaned.
    Aborted,
    /// Blob and record are both stored.
    Committed,
}

impl UploadState {
    fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Validating => "validating",
            Self::Rejected => "rejected",
            Self::WritingBlob => "writing_blob",
            Self::BlobCommitted => "blob_committed",
            Self::WritingMetadata => "writing_metadata",
            Self::Compensating => "compensating",
            Self::Aborted => "aborted",
            Self::Committed => "committed",
        }
    }

    /// Whether no further transition can follow.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Aborted | Self::Committed)
    }
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Progress<'a> {
    original_name: &'a str,
    state: UploadState,
}

impl<'a> Progress<'a> {
    fn new(original_name: &'a str) -> Self {
        Self {
            original_name,
            state: UploadState::Init,
        }
    }

    fn advance(&mut self, next: UploadState) {
        debug!(
            file = self.original_name,
            from = %self.state,
            to = %next,
            "upload state transition"
        );
        self.state = next;
    }
}

/// Pick the stored content type: the client's unless it is missing or
/// generic, in which case the extension decides.
fn resolve_content_type(supplied: &str, extension: &str) -> String {
    let supplied = supplied.trim();
    if supplied.is_empty() || supplied == "application/octet-stream" {
        mime_for_extension(extension).to_owned()
    } else {
        supplied.to_owned()
    }
}

impl FileService {
    /// Store one file: validate, write the blob, then write its record.
    ///
    /// Nothing is written when validation fails. If the record cannot be
    /// written the blob is deleted again before the error is returned.
    pub async fn upload(
        &self,
        file: FileUpload,
        options: UploadOptions,
    ) -> Result<UploadedFile, ServiceError> {
        let mut progress = Progress::new(&file.original_name);

        progress.advance(UploadState::Validating);
        let checked = self
            .policy
            .check_file(&file.original_name, file.data.len() as u64)
            .and_then(|ext| {
                self.policy
                    .check_description(options.description.as_deref())
                    .map(|()| ext)
            });
        let extension = match checked {
            Ok(ext) => ext,
            Err(violation) => {
                progress.advance(UploadState::Rejected);
                self.metrics.increment_uploads_rejected();
                return Err(violation.into());
            }
        };

        let filename = generate_unique_filename(&file.original_name);
        let content_type = resolve_content_type(&file.content_type, &extension);

        progress.advance(UploadState::WritingBlob);
        let blob = match self.write_blob(&filename, &content_type, &file.data).await {
            Ok(blob) => blob,
            Err(e) => {
                progress.advance(UploadState::Aborted);
                self.metrics.increment_uploads_aborted();
                return Err(e.into());
            }
        };
        progress.advance(UploadState::BlobCommitted);

        let record = FileRecord::new(
            filename,
            file.original_name.clone(),
            content_type,
            blob.length,
            extension,
            options.uploader,
            blob.id.clone(),
        )
        .with_description(options.description)
        .with_tags(options.tags)
        .with_public(options.is_public);

        progress.advance(UploadState::WritingMetadata);
        if let Err(e) = self.index.insert(record.clone()).await {
            progress.advance(UploadState::Compensating);
            self.compensate(&blob, &record.filename).await;
            progress.advance(UploadState::Aborted);
            self.metrics.increment_uploads_aborted();
            return Err(e.into());
        }
        progress.advance(UploadState::Committed);
        self.metrics.increment_uploads_committed();

        info!(
            filename = %record.filename,
            original = %record.original_name,
            size = record.size,
            "file uploaded"
        );
        Ok(UploadedFile {
            download_url: record.download_url(&self.url_prefix),
            view_url: record.view_url(&self.url_prefix),
            record,
        })
    }

    /// Store several files concurrently.
    ///
    /// The batch as a whole is rejected when empty or over the configured
    /// maximum. Otherwise each file succeeds or fails on its own and both
    /// lists come back in input order.
    pub async fn upload_many(
        &self,
        files: Vec<FileUpload>,
        options: UploadOptions,
    ) -> Result<BatchUploadReport, ServiceError> {
        self.policy.check_batch(files.len())?;

        let mut names = Vec::with_capacity(files.len());
        let mut positions = HashMap::with_capacity(files.len());
        let mut tasks = JoinSet::new();
        for (position, file) in files.into_iter().enumerate() {
            names.push(file.original_name.clone());
            let svc = self.clone();
            let options = options.clone();
            let handle = tasks.spawn(async move { (position, svc.upload(file, options).await) });
            positions.insert(handle.id(), position);
        }

        let mut outcomes: Vec<(usize, Result<UploadedFile, String>)> =
            Vec::with_capacity(names.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, result)) => {
                    outcomes.push((position, result.map_err(|e| e.to_string())));
                }
                Err(e) => {
                    warn!(error = %e, "upload task did not complete");
                    if let Some(&position) = positions.get(&e.id()) {
                        outcomes.push((position, Err(format!("upload task failed: {e}"))));
                    }
                }
            }
        }
        outcomes.sort_by_key(|(position, _)| *position);

        let mut report = BatchUploadReport::default();
        for (position, outcome) in outcomes {
            match outcome {
                Ok(uploaded) => report.successful.push(uploaded),
                Err(reason) => report.failed.push(UploadFailure {
                    original_name: names[position].clone(),
                    reason,
                }),
            }
        }
        info!(
            successful = report.successful.len(),
            failed = report.failed.len(),
            "batch upload settled"
        );
        Ok(report)
    }

    async fn write_blob(
        &self,
        filename: &str,
        content_type: &str,
        data: &Bytes,
    ) -> Result<BlobInfo, BlobError> {
        let mut writer = self.blobs.begin_write(filename, content_type).await?;
        let mut offset = 0;
        while offset < data.len() {
            let end = (offset + self.write_slice).min(data.len());
            if let Err(e) = writer.write(data.slice(offset..end)).await {
                if let Err(abort_err) = writer.abort().await {
                    warn!(filename, error = %abort_err, "abort after failed write also failed");
                }
                return Err(e);
            }
            offset = end;
        }
        writer.finish().await
    }

    async fn compensate(&self, blob: &BlobInfo, filename: &str) {
        match self.blobs.delete(&blob.id).await {
            Ok(_) => {
                self.metrics.increment_compensations();
                warn!(filename, blob_id = %blob.id, "record write failed, blob removed");
            }
            Err(e) => {
                self.metrics.increment_orphaned_blobs();
                error!(
                    filename,
                    blob_id = %blob.id,
                    error = %e,
                    "compensating delete failed, blob orphaned"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use depot_blob::{BlobStore, collect_bytes};
    use depot_core::{DEFAULT_MAX_FILE_SIZE, MAX_DESCRIPTION_CHARS};
    use depot_index::MetadataIndex;

    use super::*;
    use crate::test_support::{flaky_service, memory_service, png};

    #[tokio::test]
    async fn single_upload_round_trips() {
        let (svc, blobs, index) = memory_service();
        let options = UploadOptions {
            uploader: "user-1".into(),
            description: Some("holiday".into()),
            tags: vec!["travel".into()],
            is_public: true,
        };
        let up = svc.upload(png("photo.png", 500_000), options).await.unwrap();

        let rec = &up.record;
        assert_eq!(rec.original_name, "photo.png");
        assert_eq!(rec.mimetype, "image/png");
        assert_eq!(rec.size, 500_000);
        assert_eq!(rec.size_formatted, "488.28 KB");
        assert_eq!(rec.extension, "png");
        assert_eq!(rec.uploader, "user-1");
        assert_eq!(rec.path, format!("uploads/{}", rec.filename));
        assert!(rec.filename.ends_with(".png"));
        assert_eq!(up.download_url, format!("/api/files/download/{}", rec.filename));
        assert_eq!(up.view_url, format!("/api/files/view/{}", rec.filename));

        let stored = index.get(&rec.filename).await.unwrap().unwrap();
        assert_eq!(&stored, rec);
        let blob = blobs.find_by_name(&rec.filename).await.unwrap().unwrap();
        assert_eq!(blob.id, rec.blob_id);
        let body = collect_bytes(blobs.open_read(&blob.id).await.unwrap())
            .await
            .unwrap();
        assert_eq!(body, png("photo.png", 500_000).data);
    }

    #[tokio::test]
    async fn rejected_type_writes_nothing() {
        let (svc, blobs, index) = memory_service();
        let err = svc
            .upload(
                FileUpload::new("payload.exe", "application/x-msdownload", vec![0u8; 10]),
                UploadOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(
            err.to_string(),
            "Invalid file type. Allowed types: images, documents, videos, audio, zip"
        );
        assert!(blobs.is_empty());
        assert!(index.is_empty());
        assert_eq!(svc.metrics().snapshot().uploads_rejected, 1);
    }

    #[tokio::test]
    async fn oversize_and_long_description_are_rejected() {
        let (svc, blobs, _) = memory_service();
        #[allow(clippy::cast_possible_truncation)]
        let too_big = DEFAULT_MAX_FILE_SIZE as usize + 1;
        let err = svc
            .upload(png("big.png", too_big), UploadOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "File size too large. Maximum size is 10MB");

        let options = UploadOptions {
            description: Some("d".repeat(MAX_DESCRIPTION_CHARS + 1)),
            ..Default::default()
        };
        let err = svc.upload(png("a.png", 1), options).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(blobs.is_empty());
    }

    #[tokio::test]
    async fn missing_content_type_comes_from_extension() {
        let (svc, _, _) = memory_service();
        let up = svc
            .upload(
                FileUpload::new("Report.PDF", "", vec![1u8; 4]),
                UploadOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(up.record.mimetype, "application/pdf");
        assert_eq!(up.record.extension, "pdf");
    }

    #[tokio::test]
    async fn failed_record_write_removes_blob() {
        let (svc, blobs, index) = flaky_service();
        index.fail_inserts.store(true, Ordering::SeqCst);

        let err = svc
            .upload(png("a.png", 3000), UploadOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Index(_)));
        assert!(blobs.inner.is_empty(), "compensation removes the blob");

        let snap = svc.metrics().snapshot();
        assert_eq!(snap.compensations, 1);
        assert_eq!(snap.orphaned_blobs, 0);
        assert_eq!(snap.uploads_aborted, 1);
    }

    #[tokio::test]
    async fn failed_compensation_is_counted_as_orphan() {
        let (svc, blobs, index) = flaky_service();
        index.fail_inserts.store(true, Ordering::SeqCst);
        blobs.fail_deletes.store(true, Ordering::SeqCst);

        svc.upload(png("a.png", 10), UploadOptions::default())
            .await
            .unwrap_err();
        assert_eq!(blobs.inner.len(), 1);
        assert_eq!(svc.metrics().snapshot().orphaned_blobs, 1);
    }

    #[tokio::test]
    async fn failed_blob_write_aborts_and_skips_record() {
        let (svc, blobs, index) = flaky_service();
        blobs.fail_writes.store(true, Ordering::SeqCst);

        let err = svc
            .upload(png("a.png", 10), UploadOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Blob(_)));
        assert!(blobs.inner.is_empty());
        assert!(index.inner.is_empty());
    }

    #[tokio::test]
    async fn batch_with_one_oversize_file() {
        let (svc, _, index) = memory_service();
        let eleven_mib = 11 * 1024 * 1024;
        let files = vec![
            png("one.png", 10),
            png("huge.png", eleven_mib),
            FileUpload::new("notes.txt", "text/plain", "hello"),
        ];
        let report = svc.upload_many(files, UploadOptions::default()).await.unwrap();

        let names: Vec<_> = report
            .successful
            .iter()
            .map(|u| u.record.original_name.as_str())
            .collect();
        assert_eq!(names, ["one.png", "notes.txt"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].original_name, "huge.png");
        assert_eq!(
            report.failed[0].reason,
            "File size too large. Maximum size is 10MB"
        );
        assert_eq!(index.len(), 2);
    }

    #[tokio::test]
    async fn batch_size_is_enforced() {
        let (svc, blobs, _) = memory_service();
        let err = svc
            .upload_many(Vec::new(), UploadOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No files uploaded");

        let files = (0..6).map(|i| png(&format!("{i}.png"), 1)).collect();
        let err = svc
            .upload_many(files, UploadOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(blobs.is_empty());
    }

    #[tokio::test]
    async fn generated_names_are_unique() {
        let (svc, _, _) = memory_service();
        let files = (0..5).map(|_| png("same.png", 8)).collect();
        let report = svc.upload_many(files, UploadOptions::default()).await.unwrap();
        let mut names: Vec<_> = report
            .successful
            .iter()
            .map(|u| u.record.filename.clone())
            .collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 5);
    }

    #[test]
    fn terminal_states() {
        assert!(UploadState::Committed.is_terminal());
        assert!(UploadState::Rejected.is_terminal());
        assert!(!UploadState::Compensating.is_terminal());
        assert_eq!(UploadState::BlobCommitted.to_string(), "blob_committed");
    }
}

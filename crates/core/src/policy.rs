use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::naming::file_extension;

/// Largest accepted file, in bytes (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Largest accepted batch for a multi-file upload.
pub const DEFAULT_MAX_FILES: usize = 5;

/// Longest accepted description, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// Extensions accepted by default: images, office/text documents, archives,
/// audio and video.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "zip",
    "mp3", "mp4", "mov", "avi",
];

/// Reasons an upload is rejected before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    /// The extension is not on the allow-list.
    #[error("Invalid file type. Allowed types: images, documents, videos, audio, zip")]
    InvalidType {
        /// The rejected extension.
        extension: String,
    },

    /// The payload exceeds the per-file limit.
    #[error("File size too large. Maximum size is {}MB", .limit / (1024 * 1024))]
    TooLarge {
        /// Actual size.
        size: u64,
        /// Maximum allowed size.
        limit: u64,
    },

    /// The request carried no file.
    #[error("No files uploaded")]
    Empty,

    /// The description is longer than [`MAX_DESCRIPTION_CHARS`].
    #[error("Description cannot exceed {limit} characters")]
    DescriptionTooLong {
        /// Maximum allowed.
        limit: usize,
    },

    /// The batch holds more files than allowed.
    #[error("Maximum {limit} files allowed")]
    TooManyFiles {
        /// Number of files received.
        count: usize,
        /// Maximum allowed.
        limit: usize,
    },
}

/// Size, count and type limits applied to uploads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPolicy {
    /// Largest accepted file, in bytes.
    pub max_file_size: u64,
    /// Largest accepted batch.
    pub max_files: usize,
    /// Accepted extensions, lowercase.
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_files: DEFAULT_MAX_FILES,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|e| (*e).to_owned())
                .collect(),
        }
    }
}

impl UploadPolicy {
    /// Check one file and return its lowercased extension.
    ///
    /// The extension is checked before the size.
    pub fn check_file(&self, original_name: &str, size: u64) -> Result<String, PolicyViolation> {
        let extension = file_extension(original_name);
        if !self.allowed_extensions.iter().any(|e| *e == extension) {
            return Err(PolicyViolation::InvalidType { extension });
        }
        if size > self.max_file_size {
            return Err(PolicyViolation::TooLarge {
                size,
                limit: self.max_file_size,
            });
        }
        Ok(extension)
    }

    /// Check an optional description against [`MAX_DESCRIPTION_CHARS`].
    pub fn check_description(&self, description: Option<&str>) -> Result<(), PolicyViolation> {
        match description {
            Some(d) if d.chars().count() > MAX_DESCRIPTION_CHARS => {
                Err(PolicyViolation::DescriptionTooLong {
                    limit: MAX_DESCRIPTION_CHARS,
                })
            }
            _ => Ok(()),
        }
    }

    /// Check the number of files in a batch.
    pub fn check_batch(&self, count: usize) -> Result<(), PolicyViolation> {
        if count == 0 {
            return Err(PolicyViolation::Empty);
        }
        if count > self.max_files {
            return Err(PolicyViolation::TooManyFiles {
                count,
                limit: self.max_files,
            });
        }
        Ok(())
    }
}

/// Whether a content type may be served with an `inline` disposition.
pub fn is_inline_viewable(content_type: &str) -> bool {
    content_type.starts_with("image/")
        || content_type == "application/pdf"
        || content_type == "text/plain"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_allowed_extension_case_insensitively() {
        let policy = UploadPolicy::default();
        assert_eq!(policy.check_file("Photo.PNG", 10).unwrap(), "png");
    }

    #[test]
    fn rejects_unknown_extension() {
        let policy = UploadPolicy::default();
        let err = policy.check_file("payload.exe", 10).unwrap_err();
        assert!(err.to_string().starts_with("Invalid file type."));
    }

    #[test]
    fn size_limit_is_inclusive() {
        let policy = UploadPolicy::default();
        assert!(policy.check_file("a.zip", DEFAULT_MAX_FILE_SIZE).is_ok());
        let err = policy
            .check_file("a.zip", DEFAULT_MAX_FILE_SIZE + 1)
            .unwrap_err();
        assert_eq!(err.to_string(), "File size too large. Maximum size is 10MB");
    }

    #[test]
    fn type_is_checked_before_size() {
        let policy = UploadPolicy::default();
        let err = policy.check_file("a.exe", u64::MAX).unwrap_err();
        assert!(matches!(err, PolicyViolation::InvalidType { .. }));
    }

    #[test]
    fn batch_limits() {
        let policy = UploadPolicy::default();
        assert_eq!(policy.check_batch(0), Err(PolicyViolation::Empty));
        assert!(policy.check_batch(5).is_ok());
        assert!(matches!(
            policy.check_batch(6),
            Err(PolicyViolation::TooManyFiles { count: 6, limit: 5 })
        ));
    }

    #[test]
    fn description_length() {
        let policy = UploadPolicy::default();
        assert!(policy.check_description(None).is_ok());
        assert!(policy.check_description(Some(&"é".repeat(500))).is_ok());
        let err = policy.check_description(Some(&"x".repeat(501))).unwrap_err();
        assert_eq!(err.to_string(), "Description cannot exceed 500 characters");
    }

    #[test]
    fn inline_types() {
        assert!(is_inline_viewable("image/png"));
        assert!(is_inline_viewable("application/pdf"));
        assert!(is_inline_viewable("text/plain"));
        assert!(!is_inline_viewable("application/zip"));
        assert!(!is_inline_viewable("video/mp4"));
    }
}

use serde::Deserialize;

use depot_core::{
    DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_FILES, DEFAULT_URL_PREFIX,
    UploadPolicy,
};

/// Upload limits and record defaults.
#[derive(Debug, Deserialize)]
pub struct UploadsConfig {
    /// Largest accepted file in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Largest accepted multi-file batch.
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    /// Accepted extensions, without the leading dot.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    /// Uploader recorded when a request does not name one.
    #[serde(default = "default_uploader")]
    pub default_uploader: String,
    /// Prefix used to build download and view URLs.
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
}

impl UploadsConfig {
    /// The upload policy these settings describe.
    ///
    /// Extensions are normalised to lowercase without a leading dot.
    pub fn policy(&self) -> UploadPolicy {
        UploadPolicy {
            max_file_size: self.max_file_size,
            max_files: self.max_files,
            allowed_extensions: self
                .allowed_extensions
                .iter()
                .map(|e| e.trim().trim_start_matches('.').to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            max_files: default_max_files(),
            allowed_extensions: default_allowed_extensions(),
            default_uploader: default_uploader(),
            url_prefix: default_url_prefix(),
        }
    }
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

fn default_max_files() -> usize {
    DEFAULT_MAX_FILES
}

fn default_allowed_extensions() -> Vec<String> {
    DEFAULT_ALLOWED_EXTENSIONS
        .iter()
        .map(|e| (*e).to_owned())
        .collect()
}

fn default_uploader() -> String {
    "anonymous".to_owned()
}

fn default_url_prefix() -> String {
    DEFAULT_URL_PREFIX.to_owned()
}

use serde::Deserialize;

/// Blob store backend configuration.
#[derive(Debug, Deserialize)]
pub struct BlobConfig {
    /// Which backend to use: `"memory"` or `"fs"`.
    #[serde(default = "default_blob_backend")]
    pub backend: String,
    /// Root directory for the `fs` backend.
    #[serde(default = "default_blob_path")]
    pub path: String,
    /// Chunk size in bytes. Defaults to 255 KiB.
    pub chunk_size: Option<usize>,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            backend: default_blob_backend(),
            path: default_blob_path(),
            chunk_size: None,
        }
    }
}

fn default_blob_backend() -> String {
    "memory".to_owned()
}

fn default_blob_path() -> String {
    "data/blobs".to_owned()
}

/// Metadata index backend configuration.
#[derive(Debug, Deserialize)]
pub struct IndexConfig {
    /// Which backend to use: `"memory"` or `"postgres"`.
    #[serde(default = "default_index_backend")]
    pub backend: String,
    /// Connection URL for the `postgres` backend.
    pub url: Option<String>,
    /// Table name prefix.
    #[serde(default = "default_index_prefix")]
    pub prefix: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: default_index_backend(),
            url: None,
            prefix: default_index_prefix(),
        }
    }
}

fn default_index_backend() -> String {
    "memory".to_owned()
}

fn default_index_prefix() -> String {
    "depot_".to_owned()
}

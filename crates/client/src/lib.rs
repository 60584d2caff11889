//! Depot HTTP Client
//!
//! A native Rust client for the Depot file store REST API.
//!
//! # Quick Start
//!
//! ```no_run
//! use depot_client::{DepotClient, UploadFields, UploadFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), depot_client::Error> {
//!     let client = DepotClient::new("http://localhost:5000");
//!
//!     let file = UploadFile::new("notes.txt", "text/plain", b"hello".to_vec());
//!     let uploaded = client.upload(file, &UploadFields::default()).await?;
//!
//!     let content = client.download(&uploaded.record.filename).await?;
//!     assert_eq!(&content.data[..], b"hello");
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! ```no_run
//! use depot_client::DepotClientBuilder;
//! use std::time::Duration;
//!
//! let client = DepotClientBuilder::new("http://localhost:5000")
//!     .timeout(Duration::from_secs(120))
//!     .build()
//!     .unwrap();
//! ```

mod error;
pub mod files;

pub use error::Error;
pub use files::{
    BatchUpload, DownloadedFile, FailedUpload, FileList, FileStream, ListFilesQuery,
    UploadFields, UploadFile, UploadedFile,
};

// Re-exported so callers don't need a direct `depot_core` dependency.
pub use depot_core::{FileRecord, FileStats, SortField, SortOrder};

use std::time::Duration;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Characters left unescaped in a path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// HTTP client for the Depot file store.
#[derive(Debug, Clone)]
pub struct DepotClient {
    client: Client,
    base_url: String,
}

/// Builder for configuring a [`DepotClient`].
#[derive(Debug)]
pub struct DepotClientBuilder {
    base_url: String,
    timeout: Duration,
    client: Option<Client>,
}

impl DepotClientBuilder {
    /// Create a new builder with the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            client: None,
        }
    }

    /// Set the request timeout.
    ///
    /// The timeout covers the whole exchange, including reading a download.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a custom reqwest Client.
    ///
    /// Useful for configuring TLS, proxies, or other advanced settings.
    #[must_use]
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<DepotClient, Error> {
        let client = match self.client {
            Some(c) => c,
            None => Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(|e| Error::Configuration(e.to_string()))?,
        };

        Ok(DepotClient {
            client,
            base_url: self.base_url,
        })
    }
}

/// Error body returned by the server.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    error: Option<String>,
}

impl DepotClient {
    /// Create a new client with default configuration.
    pub fn new(base_url: impl Into<String>) -> Self {
        DepotClientBuilder::new(base_url)
            .build()
            .expect("default client configuration should not fail")
    }

    /// Create a builder for advanced configuration.
    pub fn builder(base_url: impl Into<String>) -> DepotClientBuilder {
        DepotClientBuilder::new(base_url)
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if the server is healthy.
    pub async fn health(&self) -> Result<bool, Error> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        Ok(response.status().is_success())
    }

    fn file_url(&self, route: &str, filename: &str) -> String {
        let segment = utf8_percent_encode(filename, PATH_SEGMENT);
        if route.is_empty() {
            format!("{}/api/files/{segment}", self.base_url)
        } else {
            format!("{}/api/files/{route}/{segment}", self.base_url)
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, Error> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, Error> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}

async fn error_from_response(response: reqwest::Response) -> Error {
    let status = response.status();
    let message = match response.json::<ErrorBody>().await {
        Ok(body) => match body.error {
            Some(detail) => format!("{}: {detail}", body.message),
            None => body.message,
        },
        Err(_) => status.to_string(),
    };
    Error::Http {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_trims_trailing_slash() {
        let client = DepotClient::new("http://localhost:5000/");
        assert_eq!(client.base_url(), "http://localhost:5000");
    }

    #[test]
    fn client_preserves_url_without_slash() {
        let client = DepotClient::new("http://localhost:5000");
        assert_eq!(client.base_url(), "http://localhost:5000");
    }

    #[test]
    fn file_urls_escape_names() {
        let client = DepotClient::new("http://h");
        assert_eq!(
            client.file_url("download", "1-abc.png"),
            "http://h/api/files/download/1-abc.png"
        );
        assert_eq!(
            client.file_url("", "a b/c.txt"),
            "http://h/api/files/a%20b%2Fc.txt"
        );
    }

    #[test]
    fn error_predicates() {
        let not_found = Error::Http {
            status: 404,
            message: "File not found".into(),
        };
        assert!(not_found.is_not_found());
        assert!(!not_found.is_bad_request());
        assert!(!Error::Connection("refused".into()).is_not_found());
    }
}

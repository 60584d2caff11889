mod logging;
mod server;
mod storage;
mod uploads;


pub use logging::*;
pub use server::*;
pub use storage::*;
pub use uploads::*;

use std::io::ErrorKind;
use std::path::Path;

use serde::Deserialize;

use crate::error::ServerError;

/// Top-level configuration for the Depot server, loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct DepotConfig {
    /// HTTP server bind configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Blob store backend configuration.
    #[serde(default)]
    pub blob: BlobConfig,
    /// Metadata index backend configuration.
    #[serde(default)]
    pub index: IndexConfig,
    /// Upload limits and record defaults.
    #[serde(default)]
    pub uploads: UploadsConfig,
    /// Log level and output format.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DepotConfig {
    /// Load the configuration at `path`.
    ///
    /// A missing file yields the defaults. The flag reports whether the file
    /// was found.
    pub fn load(path: impl AsRef<Path>) -> Result<(Self, bool), ServerError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .map(|config| (config, true))
                .map_err(|e| ServerError::Config(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok((Self::default(), false)),
            Err(e) => Err(e.into()),
        }
    }
}

use std::sync::Arc;

use depot_index::MetadataIndex;
use depot_index_memory::MemoryIndex;
use tracing::info;

use crate::config::IndexConfig;
use crate::error::ServerError;

/// Create a metadata index based on the configuration.
///
/// SQL backends run their migrations while connecting.
pub async fn create_index(config: &IndexConfig) -> Result<Arc<dyn MetadataIndex>, ServerError> {
    match config.backend.as_str() {
        "memory" => {
            info!("using in-memory metadata index");
            Ok(Arc::new(MemoryIndex::new()))
        }
        #[cfg(feature = "postgres")]
        "postgres" => {
            let url = config
                .url
                .as_deref()
                .ok_or_else(|| ServerError::Config("index.url is required for postgres".into()))?;
            let pg_config =
                depot_index_postgres::PostgresIndexConfig::new(url).with_prefix(&config.prefix);
            let index = depot_index_postgres::PostgresIndex::new(&pg_config)
                .await
                .map_err(|e| ServerError::Config(format!("postgres index: {e}")))?;
            info!(prefix = %config.prefix, "using postgres metadata index");
            Ok(Arc::new(index))
        }
        #[cfg(not(feature = "postgres"))]
        "postgres" => Err(ServerError::Config(
            "postgres index backend requires the `postgres` feature".into(),
        )),
        other => Err(ServerError::Config(format!(
            "unknown index backend: {other}"
        ))),
    }
}

/// Run the index backend's migrations and close the connection.
///
/// A no-op for backends without a schema.
pub async fn run_migrations(config: &IndexConfig) -> Result<(), ServerError> {
    if config.backend == "memory" {
        info!("memory index has no migrations");
        return Ok(());
    }
    let index = create_index(config).await?;
    index
        .close()
        .await
        .map_err(|e| ServerError::Config(format!("closing index: {e}")))?;
    info!(backend = %config.backend, "index migrations complete");
    Ok(())
}

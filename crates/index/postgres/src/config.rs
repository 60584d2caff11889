/// Configuration for the Postgres metadata index.
#[derive(Debug, Clone)]
pub struct PostgresIndexConfig {
    /// Postgres connection URL.
    pub url: String,
    /// Table name prefix (e.g. "depot_").
    pub prefix: String,
}

impl PostgresIndexConfig {
    /// Create a new configuration with the given URL and the default prefix.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            prefix: "depot_".to_owned(),
        }
    }

    /// Set the table prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

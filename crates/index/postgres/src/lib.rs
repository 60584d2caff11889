pub mod config;
pub mod migrations;
pub mod stats;
pub mod store;

pub use config::PostgresIndexConfig;
pub use stats::PostgresStatsStore;
pub use store::PostgresIndex;

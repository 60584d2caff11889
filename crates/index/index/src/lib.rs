pub mod error;
pub mod stats;
pub mod store;
pub mod testing;

pub use error::IndexError;
pub use stats::{InMemoryStats, StatsStore};
pub use store::MetadataIndex;

pub mod chunker;
pub mod error;
pub mod store;
pub mod testing;
pub mod types;

pub use chunker::{ChunkSummary, Chunker};
pub use error::BlobError;
pub use store::{BlobStore, BlobWriter, ByteStream, collect_bytes};
pub use types::{BlobInfo, DEFAULT_CHUNK_SIZE};

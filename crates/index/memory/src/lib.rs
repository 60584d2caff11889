pub mod store;

pub use store::MemoryIndex;

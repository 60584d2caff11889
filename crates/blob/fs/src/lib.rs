//! Filesystem blob store.
//!
//! Layout under the configured root:
//!
//! ```text
//! staging/<id>/          writes in progress
//! blobs/<id>/blob.json   committed descriptor
//! blobs/<id>/00000000.chunk ...
//! ```
//!
//! A write is committed by renaming its staging directory into `blobs/`,
//! so a blob is either fully visible or absent.

pub mod store;

pub use store::FsBlobStore;

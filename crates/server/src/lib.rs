pub mod api;
pub mod blob_factory;
pub mod config;
pub mod error;
pub mod index_factory;
pub mod logging;

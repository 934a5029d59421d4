//! Watchlist Media Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod catalog_client;
pub mod config;
pub mod media_service;
pub mod media_store;
pub mod server;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use catalog_client::{CatalogClient, CatalogError, KinopoiskClient};
pub use media_service::{LookupError, MediaService};
pub use media_store::{MediaRecord, MediaStore, SqliteMediaStore, StoreError};
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};

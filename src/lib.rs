//! Collections Server Library
//!
//! Product collections backed by SQLite and served over HTTP. The library
//! exposes the internal modules for the binaries and the end-to-end tests.

pub mod collection_store;
pub mod collections;
pub mod config;
pub mod server;
pub mod sqlite_persistence;
pub mod upstream;

// Re-export commonly used types for convenience
pub use collection_store::{CollectionStore, SqliteCollectionStore};
pub use collections::{CollectionFilter, CollectionSynchronizer, SyncSettings};
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};

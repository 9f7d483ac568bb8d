//! SoundWeb graph server library
//!
//! This library exposes the internal modules for the server and pipeline
//! binaries and for the end-to-end tests.

pub mod background_jobs;
pub mod cache;
pub mod config;
pub mod data_files;
pub mod export;
pub mod genre_analysis;
pub mod genre_map;
pub mod graph_store;
pub mod pipeline;
pub mod query;
pub mod reconcile;
pub mod server;
pub mod sources;
pub mod sqlite_persistence;
pub mod top_genres;

// Re-export commonly used types for convenience
pub use cache::{CacheStore, InMemoryCacheStore, SyncToken};
pub use data_files::DataDir;
pub use export::GraphExporter;
pub use graph_store::{GraphStore, SqliteGraphStore};
pub use query::GraphQueryService;
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};

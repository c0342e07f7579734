//! Infrastructure layer for the catalog store, page fetching and parsing
//!
//! This module provides the SQLite connection and repositories, the HTTP
//! fetcher, per-source extraction strategies, the snapshot writer, and the
//! configuration and logging setup.

pub mod catalog_error;
pub mod catalog_repository;
pub mod config;
pub mod database_connection;
pub mod http_client;
pub mod logging;
pub mod parsing;
pub mod run_repository;
pub mod snapshot;

// Re-export commonly used items
pub use catalog_error::{CatalogError, CatalogResult};
pub use catalog_repository::CatalogRepository;
pub use config::{AppConfig, ConfigManager};
pub use database_connection::DatabaseConnection;
pub use http_client::{FetchError, HttpClient, PageFetcher};
pub use logging::{get_log_directory, init_logging_with_config};
pub use parsing::{DekalbUaExtractor, ExtractionStrategy};
pub use run_repository::RunRepository;
pub use snapshot::SnapshotWriter;

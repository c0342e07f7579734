//! Parostok Catalog - seed hybrid catalog with per-field provenance
//!
//! Crawls manufacturer product pages, extracts evidenced attributes and
//! reconciles them into a SQLite catalog so unchanged data is never
//! rewritten and changed data is replaced atomically.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

#[cfg(test)]
pub mod test_utils;

pub use application::{CatalogService, ImportReport, SourceRegistry};
pub use domain::{CatalogSnapshot, Item, Run, RunStatus, UpdateRequest};
pub use infrastructure::{AppConfig, ConfigManager};

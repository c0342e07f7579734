//! Application layer - catalog workflows
//!
//! Page discovery, per-source crawling, reconciliation, job tracking and the
//! service facade that outer surfaces talk to.

pub mod catalog_service;
pub mod job_store;
pub mod page_discovery_service;
pub mod reconciler;
pub mod source_crawler;
pub mod source_registry;
pub mod update_job;

// Re-export commonly used items
pub use catalog_service::{CatalogService, ImportReport, parse_import_payload};
pub use job_store::JobStore;
pub use page_discovery_service::{DiscoveryRules, PageDiscoveryService};
pub use reconciler::{ReconcileCounts, Reconciliation, Reconciler, fingerprint};
pub use source_crawler::{CatalogCrawler, CrawlOutcome, PageFailure, SourceError};
pub use source_registry::SourceRegistry;
pub use update_job::UpdateJobRunner;

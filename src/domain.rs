//! Domain module - catalog entities, run records and source metadata
//!
//! Plain data types shared by the infrastructure and application layers.
//! Nothing in here performs I/O.

pub mod hybrid;
pub mod run;
pub mod source;

pub use hybrid::{
    Attribute, AttributeValue, CandidateAttribute, CatalogSnapshot, Hybrid, HybridIdentity,
    HybridWithAttributes, Item, EVIDENCE_MAX_CHARS, TEXT_PATTERN_SELECTOR, UNCATEGORIZED_CROP,
};
pub use run::{Run, RunCounts, RunLogEntry, RunStatus, RunSummary};
pub use source::{SourceDescriptor, SourcesOverview, UpdateRequest};

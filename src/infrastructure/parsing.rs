//! Per-source extraction strategies
//!
//! A strategy knows where its catalog starts, which URL segment marks catalog
//! pages, and how to turn one product page into an [`Item`]. Parsing never
//! fails for a page: a label that is not found simply yields no attribute.
//!
//! Strategies are coupled to one page layout. When a site rewrites its text
//! labels the strategy keeps working but returns fewer attributes.

pub mod dekalb_ua;
pub mod page_text;

pub use dekalb_ua::DekalbUaExtractor;
pub use page_text::{collapse_whitespace, visible_text};

use crate::domain::Item;

/// Produce a catalog item from a fetched product page
pub trait ExtractionStrategy: Send + Sync {
    /// Registry id of the source this strategy serves
    fn source_id(&self) -> &str;

    fn market(&self) -> &str;

    /// Page whose links lead to the catalog pages
    fn start_url(&self) -> &str;

    /// Path segment shared by every catalog and product page, e.g. `/Products/Dekalb/`
    fn catalog_marker(&self) -> &str;

    fn parse_product(&self, url: &str, html: &str) -> Item;
}

//! Page Discovery Service
//!
//! Finds catalog pages linked from a source's start page, then product pages
//! linked from each catalog page. Links are kept or rejected purely by URL
//! shape: the host must match the page they were found on, and the path
//! depth (number of slashes) separates catalog pages (exactly 3) from
//! product pages (4 or more).

use anyhow::{Result, anyhow};
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use tracing::{debug, info};
use url::Url;

use crate::infrastructure::{FetchError, PageFetcher};

/// Path depth of a category listing page, e.g. `/Products/Dekalb/Corn`
pub const CATALOG_PAGE_DEPTH: usize = 3;

/// Minimum path depth of a product page, e.g. `/Products/Dekalb/Corn/DKS3747`
pub const PRODUCT_PAGE_MIN_DEPTH: usize = 4;

/// URL-shape rules for one source
#[derive(Debug, Clone)]
pub struct DiscoveryRules {
    catalog_marker: String,
}

impl DiscoveryRules {
    /// `catalog_marker` is the path segment shared by all catalog pages, e.g. `/Products/Dekalb/`
    pub fn new(catalog_marker: impl Into<String>) -> Self {
        Self {
            catalog_marker: catalog_marker.into(),
        }
    }

    fn catalog_root(&self) -> &str {
        self.catalog_marker.trim_end_matches('/')
    }

    /// Whether `candidate`, linked from the start page, is a catalog page
    pub fn is_catalog_page(&self, start: &Url, candidate: &Url) -> bool {
        let path = candidate.path();
        same_host(start, candidate)
            && path.contains(self.catalog_marker.as_str())
            && path.trim_end_matches('/') != self.catalog_root()
            && path_depth(path) == CATALOG_PAGE_DEPTH
    }

    /// Whether `candidate`, linked from `catalog`, is a product page under it
    pub fn is_product_page(&self, catalog: &Url, candidate: &Url) -> bool {
        let prefix = format!("{}/", catalog.path().trim_end_matches('/'));
        let path = candidate.path();
        same_host(catalog, candidate)
            && path.starts_with(&prefix)
            && path.trim_end_matches('/') != prefix.trim_end_matches('/')
            && path_depth(path) >= PRODUCT_PAGE_MIN_DEPTH
    }
}

/// Number of `/` characters in a URL path
pub fn path_depth(path: &str) -> usize {
    path.matches('/').count()
}

fn same_host(base: &Url, candidate: &Url) -> bool {
    candidate.host_str().is_some() && candidate.host_str() == base.host_str()
}

/// Service for discovering catalog and product pages
pub struct PageDiscoveryService {
    rules: DiscoveryRules,
    link_selector: Selector,
}

impl PageDiscoveryService {
    pub fn new(rules: DiscoveryRules) -> Result<Self> {
        let link_selector =
            Selector::parse("a[href]").map_err(|e| anyhow!("invalid link selector: {e}"))?;
        Ok(Self {
            rules,
            link_selector,
        })
    }

    /// Absolute link targets of a page, query and fragment removed
    fn resolved_links(&self, page_url: &Url, html: &str) -> Vec<Url> {
        let document = Html::parse_document(html);
        document
            .select(&self.link_selector)
            .filter_map(|anchor| anchor.value().attr("href"))
            .filter_map(|href| page_url.join(href.trim()).ok())
            .map(|mut url| {
                url.set_query(None);
                url.set_fragment(None);
                url
            })
            .collect()
    }

    /// Catalog pages linked from an already fetched start page
    pub fn catalog_pages(&self, start_url: &str, html: &str) -> BTreeSet<String> {
        let Ok(start) = Url::parse(start_url) else {
            return BTreeSet::new();
        };
        self.resolved_links(&start, html)
            .into_iter()
            .filter(|candidate| self.rules.is_catalog_page(&start, candidate))
            .map(String::from)
            .collect()
    }

    /// Product pages linked from an already fetched catalog page
    pub fn product_pages(&self, catalog_url: &str, html: &str) -> BTreeSet<String> {
        let Ok(catalog) = Url::parse(catalog_url) else {
            return BTreeSet::new();
        };
        self.resolved_links(&catalog, html)
            .into_iter()
            .filter(|candidate| self.rules.is_product_page(&catalog, candidate))
            .map(String::from)
            .collect()
    }

    /// Fetch the start page and return its catalog pages in sorted order
    pub async fn discover_catalog_pages(
        &self,
        fetcher: &dyn PageFetcher,
        start_url: &str,
    ) -> Result<BTreeSet<String>, FetchError> {
        info!("🔍 Discovering catalog pages from {}", start_url);
        let html = fetcher.fetch(start_url).await?;
        let pages = self.catalog_pages(start_url, &html);
        debug!("Found {} catalog pages", pages.len());
        Ok(pages)
    }

    /// Fetch one catalog page and return its product pages in sorted order
    pub async fn discover_product_pages(
        &self,
        fetcher: &dyn PageFetcher,
        catalog_url: &str,
    ) -> Result<BTreeSet<String>, FetchError> {
        let html = fetcher.fetch(catalog_url).await?;
        let pages = self.product_pages(catalog_url, &html);
        debug!("Found {} product pages on {}", pages.len(), catalog_url);
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const START: &str = "https://www.cropscience.bayer.ua/Products/Dekalb";
    const CORN: &str = "https://www.cropscience.bayer.ua/Products/Dekalb/Corn";

    fn rules() -> DiscoveryRules {
        DiscoveryRules::new("/Products/Dekalb/")
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[rstest]
    #[case("https://www.cropscience.bayer.ua/Products/Dekalb/Corn", true)]
    #[case("https://www.cropscience.bayer.ua/Products/Dekalb/Sunflower", true)]
    #[case("https://www.cropscience.bayer.ua/Products/Dekalb/", false)]
    #[case("https://www.cropscience.bayer.ua/Products/Dekalb", false)]
    #[case("https://www.cropscience.bayer.ua/Products/Dekalb/Corn/DKS3747", false)]
    #[case("https://www.cropscience.bayer.ua/Products/Other/Corn", false)]
    #[case("https://shop.cropscience.bayer.ua/Products/Dekalb/Corn", false)]
    fn test_catalog_page_shape(#[case] candidate: &str, #[case] expected: bool) {
        assert_eq!(rules().is_catalog_page(&url(START), &url(candidate)), expected);
    }

    #[rstest]
    #[case("https://www.cropscience.bayer.ua/Products/Dekalb/Corn/DKS3747", true)]
    #[case("https://www.cropscience.bayer.ua/Products/Dekalb/Corn/DKC4351/details", true)]
    #[case("https://www.cropscience.bayer.ua/Products/Dekalb/Corn/", false)]
    #[case("https://www.cropscience.bayer.ua/Products/Dekalb/Corn", false)]
    #[case("https://www.cropscience.bayer.ua/Products/Dekalb/Sunflower/DKF3333", false)]
    #[case("https://www.cropscience.bayer.ua/Products/Dekalb/CornSeeds/X1", false)]
    #[case("https://other.example.com/Products/Dekalb/Corn/DKS3747", false)]
    fn test_product_page_shape(#[case] candidate: &str, #[case] expected: bool) {
        assert_eq!(rules().is_product_page(&url(CORN), &url(candidate)), expected);
    }

    #[test]
    fn test_path_depth() {
        assert_eq!(path_depth("/Products/Dekalb"), 2);
        assert_eq!(path_depth("/Products/Dekalb/Corn"), 3);
        assert_eq!(path_depth("/Products/Dekalb/Corn/DKS3747"), 4);
    }

    #[test]
    fn test_catalog_pages_resolve_dedupe_and_sort() {
        let service = PageDiscoveryService::new(rules()).unwrap();
        let html = r#"
            <a href="/Products/Dekalb/Sunflower?utm=1">Соняшник</a>
            <a href="Dekalb/Corn">Кукурудза (relative)</a>
            <a href="https://www.cropscience.bayer.ua/Products/Dekalb/Corn#top">Кукурудза</a>
            <a href="/Products/Dekalb">Усі</a>
            <a href="mailto:info@bayer.ua">Пошта</a>
            <a href="https://twitter.com/Products/Dekalb/Corn">Twitter</a>
        "#;
        let pages: Vec<String> = service.catalog_pages(START, html).into_iter().collect();
        assert_eq!(
            pages,
            vec![
                "https://www.cropscience.bayer.ua/Products/Dekalb/Corn".to_string(),
                "https://www.cropscience.bayer.ua/Products/Dekalb/Sunflower".to_string(),
            ]
        );
    }

    #[test]
    fn test_product_pages_only_under_catalog_prefix() {
        let service = PageDiscoveryService::new(rules()).unwrap();
        let html = r#"
            <a href="/Products/Dekalb/Corn/DKS3747">DKS3747</a>
            <a href="Corn/DKC4351?ref=list">DKC4351</a>
            <a href="/Products/Dekalb/Corn">back</a>
            <a href="/Products/Dekalb/Sunflower/DKF3333">other crop</a>
        "#;
        let pages: Vec<String> = service.product_pages(CORN, html).into_iter().collect();
        assert_eq!(
            pages,
            vec![
                "https://www.cropscience.bayer.ua/Products/Dekalb/Corn/DKC4351".to_string(),
                "https://www.cropscience.bayer.ua/Products/Dekalb/Corn/DKS3747".to_string(),
            ]
        );
    }

    #[test]
    fn test_unparseable_base_yields_nothing() {
        let service = PageDiscoveryService::new(rules()).unwrap();
        assert!(service.catalog_pages("not a url", "<a href='/x'>x</a>").is_empty());
    }
}

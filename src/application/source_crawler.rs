//! Two-hop crawl of one catalog source
//!
//! start page → catalog pages → product pages → items. Pages are fetched one
//! at a time and product pages are always visited in sorted order, so two runs
//! over an unchanged site produce the same logs and the same items.

use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::page_discovery_service::{DiscoveryRules, PageDiscoveryService};
use crate::domain::Item;
use crate::infrastructure::{CatalogError, ExtractionStrategy, FetchError, PageFetcher};

/// Failure that aborts one source's pipeline
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("start page unavailable: {0}")]
    StartPage(#[source] FetchError),

    #[error("catalog store error: {0}")]
    Store(#[from] CatalogError),

    #[error("crawler setup failed: {0}")]
    Setup(String),
}

/// A page that was skipped because it could not be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    pub url: String,
    pub error: FetchError,
}

/// Everything one crawl produced
#[derive(Debug, Clone, Default)]
pub struct CrawlOutcome {
    pub catalog_urls: BTreeSet<String>,
    pub product_urls: BTreeSet<String>,
    pub items: Vec<Item>,
    pub page_failures: Vec<PageFailure>,
}

/// Discovery plus extraction for one source
pub struct CatalogCrawler {
    fetcher: Arc<dyn PageFetcher>,
    strategy: Arc<dyn ExtractionStrategy>,
    discovery: PageDiscoveryService,
}

impl CatalogCrawler {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        strategy: Arc<dyn ExtractionStrategy>,
    ) -> Result<Self, SourceError> {
        let rules = DiscoveryRules::new(strategy.catalog_marker());
        let discovery =
            PageDiscoveryService::new(rules).map_err(|e| SourceError::Setup(e.to_string()))?;
        Ok(Self {
            fetcher,
            strategy,
            discovery,
        })
    }

    pub fn source_id(&self) -> &str {
        self.strategy.source_id()
    }

    /// Catalog pages linked from the start page; an unreachable start page fails the source
    pub async fn catalog_pages(&self) -> Result<BTreeSet<String>, SourceError> {
        self.discovery
            .discover_catalog_pages(self.fetcher.as_ref(), self.strategy.start_url())
            .await
            .map_err(SourceError::StartPage)
    }

    /// Union of product pages over all catalog pages; unreachable catalog pages are skipped
    pub async fn product_pages(
        &self,
        catalog_urls: &BTreeSet<String>,
    ) -> (BTreeSet<String>, Vec<PageFailure>) {
        let mut product_urls = BTreeSet::new();
        let mut failures = Vec::new();

        for catalog_url in catalog_urls {
            match self
                .discovery
                .discover_product_pages(self.fetcher.as_ref(), catalog_url)
                .await
            {
                Ok(urls) => product_urls.extend(urls),
                Err(error) => {
                    warn!("⚠️ Skipping catalog page {}: {}", catalog_url, error);
                    failures.push(PageFailure {
                        url: catalog_url.clone(),
                        error,
                    });
                }
            }
        }

        (product_urls, failures)
    }

    /// Fetch and parse every product page in sorted order.
    ///
    /// Pages whose heading is missing produce no item. Pages that cannot be
    /// fetched are reported as failures.
    pub async fn extract_items(
        &self,
        product_urls: &BTreeSet<String>,
    ) -> (Vec<Item>, Vec<PageFailure>) {
        let mut items = Vec::new();
        let mut failures = Vec::new();

        for product_url in product_urls {
            match self.fetcher.fetch(product_url).await {
                Ok(html) => {
                    let item = self.strategy.parse_product(product_url, &html);
                    if item.has_name() {
                        items.push(item);
                    } else {
                        warn!("Product page without a name: {}", product_url);
                    }
                }
                Err(error) => {
                    warn!("⚠️ Skipping product page {}: {}", product_url, error);
                    failures.push(PageFailure {
                        url: product_url.clone(),
                        error,
                    });
                }
            }
        }

        (items, failures)
    }

    /// Run discovery and extraction end to end
    pub async fn run(&self) -> Result<CrawlOutcome, SourceError> {
        info!("🚀 Crawling source {}", self.source_id());

        let catalog_urls = self.catalog_pages().await?;
        let (product_urls, mut page_failures) = self.product_pages(&catalog_urls).await;
        let (items, item_failures) = self.extract_items(&product_urls).await;
        page_failures.extend(item_failures);

        info!(
            "✅ Source {}: {} catalog pages, {} product pages, {} items",
            self.source_id(),
            catalog_urls.len(),
            product_urls.len(),
            items.len()
        );

        Ok(CrawlOutcome {
            catalog_urls,
            product_urls,
            items,
            page_failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::DekalbUaExtractor;
    use crate::test_utils::StaticPageFetcher;

    const BASE: &str = "https://www.cropscience.bayer.ua";

    fn crawler(fetcher: StaticPageFetcher) -> CatalogCrawler {
        CatalogCrawler::new(
            Arc::new(fetcher),
            Arc::new(DekalbUaExtractor::new().unwrap()),
        )
        .unwrap()
    }

    fn site() -> StaticPageFetcher {
        StaticPageFetcher::new()
            .with_page(
                &format!("{BASE}/Products/Dekalb"),
                r#"<a href="/Products/Dekalb/Corn">Кукурудза</a><a href="/Products/Dekalb/Rapeseed">Ріпак</a>"#,
            )
            .with_page(
                &format!("{BASE}/Products/Dekalb/Corn"),
                r#"<a href="/Products/Dekalb/Corn/DKS3747">a</a>
                   <a href="/Products/Dekalb/Corn/DKC4351">b</a>
                   <a href="/Products/Dekalb/Corn/Broken">c</a>"#,
            )
            .with_page(
                &format!("{BASE}/Products/Dekalb/Corn/DKS3747"),
                "<h1>ДКС 3747</h1><p>ФАО: 260</p>",
            )
            .with_page(
                &format!("{BASE}/Products/Dekalb/Corn/DKC4351"),
                "<p>сторінка без заголовка</p>",
            )
    }

    #[tokio::test]
    async fn test_run_collects_items_and_failures() {
        let outcome = crawler(site()).run().await.unwrap();

        assert_eq!(outcome.catalog_urls.len(), 2);
        assert_eq!(outcome.product_urls.len(), 3);
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.items[0].name, "ДКС 3747");

        let failed: Vec<&str> = outcome.page_failures.iter().map(|f| f.url.as_str()).collect();
        assert_eq!(
            failed,
            vec![
                "https://www.cropscience.bayer.ua/Products/Dekalb/Rapeseed",
                "https://www.cropscience.bayer.ua/Products/Dekalb/Corn/Broken",
            ]
        );
    }

    #[tokio::test]
    async fn test_unreachable_start_page_fails_source() {
        let result = crawler(StaticPageFetcher::new()).run().await;
        assert!(matches!(result, Err(SourceError::StartPage(_))));
    }
}

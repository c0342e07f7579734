//! Test utilities for the catalog crawler
//!
//! Provides an isolated on-disk database per test and a canned-page fetcher
//! so discovery, crawl and update-job tests never touch the network.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tempfile::TempDir;

use crate::domain::{AttributeValue, CandidateAttribute, Item};
use crate::infrastructure::{DatabaseConnection, FetchError, PageFetcher};

/// Test database living in its own temporary directory
pub struct TestDatabase {
    pub connection: DatabaseConnection,
    _dir: TempDir,
}

impl TestDatabase {
    /// Create a fresh, migrated database
    ///
    /// A file is used instead of `sqlite::memory:` so every pooled connection
    /// sees the same data.
    pub async fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let url = format!("sqlite:{}", dir.path().join("test.db").display());
        let connection = DatabaseConnection::new(&url).await?;
        connection.migrate().await?;
        Ok(Self {
            connection,
            _dir: dir,
        })
    }

    pub fn pool(&self) -> sqlx::SqlitePool {
        self.connection.pool().clone()
    }
}

/// Serves fixed HTML per URL; any other URL answers 404
#[derive(Debug, Clone, Default)]
pub struct StaticPageFetcher {
    pages: HashMap<String, String>,
}

impl StaticPageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }
}

#[async_trait]
impl PageFetcher for StaticPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::HttpStatus {
                url: url.to_string(),
                status: 404,
            })
    }
}

/// A corn hybrid item with the given text attributes
pub fn corn_item(name: &str, attributes: &[(&str, &str)]) -> Item {
    let source_url = format!("https://www.cropscience.bayer.ua/Products/Dekalb/Corn/{name}");
    Item {
        crop: Some("corn".to_string()),
        name: name.to_string(),
        market: "UA".to_string(),
        brand: Some("DEKALB (Bayer)".to_string()),
        source_url,
        attributes: attributes
            .iter()
            .map(|(key, value)| {
                CandidateAttribute::new(
                    *key,
                    AttributeValue::text(*value),
                    format!("{key}: {value}"),
                )
            })
            .collect(),
    }
}

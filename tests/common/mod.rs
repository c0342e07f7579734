//! Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use parostok_catalog::domain::{AttributeValue, CandidateAttribute, Item};
use parostok_catalog::infrastructure::{DatabaseConnection, FetchError, PageFetcher, SnapshotWriter};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub const BASE: &str = "https://www.cropscience.bayer.ua";

/// Migrated SQLite file and snapshot path inside one temp directory
pub struct TestEnv {
    pub db: DatabaseConnection,
    pub snapshot_path: PathBuf,
    _dir: TempDir,
}

impl TestEnv {
    pub async fn new() -> TestEnv {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("catalog.db").display());
        let db = DatabaseConnection::new(&url).await.unwrap();
        db.migrate().await.unwrap();
        TestEnv {
            db,
            snapshot_path: dir.path().join("catalog_fallback.json"),
            _dir: dir,
        }
    }

    pub fn snapshot_writer(&self) -> SnapshotWriter {
        SnapshotWriter::new(&self.snapshot_path)
    }
}

/// Canned pages keyed by URL; unknown URLs answer 404
#[derive(Default, Clone)]
pub struct FakeSite {
    pages: HashMap<String, String>,
}

impl FakeSite {
    pub fn page(mut self, path: &str, html: &str) -> Self {
        self.pages.insert(format!("{BASE}{path}"), html.to_string());
        self
    }

    pub fn into_fetcher(self) -> Arc<dyn PageFetcher> {
        Arc::new(self)
    }
}

#[async_trait]
impl PageFetcher for FakeSite {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.pages.get(url).cloned().ok_or_else(|| FetchError::HttpStatus {
            url: url.to_string(),
            status: 404,
        })
    }
}

/// Start page, one crop listing and two product pages
pub fn dekalb_site() -> FakeSite {
    FakeSite::default()
        .page(
            "/Products/Dekalb",
            r#"<nav><a href="/Products/Dekalb/Corn">Кукурудза</a><a href="/Products/Dekalb">Усі</a></nav>"#,
        )
        .page(
            "/Products/Dekalb/Corn",
            r#"<ul>
                 <li><a href="/Products/Dekalb/Corn/DKS3747">ДКС 3747</a></li>
                 <li><a href="/Products/Dekalb/Corn/DKC4351?from=list">DKC4351</a></li>
               </ul>"#,
        )
        .page(
            "/Products/Dekalb/Corn/DKS3747",
            r#"<h1>ДКС 3747</h1>
               <p>ФАО: 260</p>
               <p>Тип зерна: зубовидний</p>
               <h2>ПОЗИЦІОНУВАННЯ ГІБРИДА</h2>
               <p>Зона вирощування: усі зони</p>
               <h2>ХАРАКТЕРИСТИКА ГІБРИДА</h2>
               <p>Холодостійкість ● ● ● ● ● ● ● ● ● 9</p>"#,
        )
        .page(
            "/Products/Dekalb/Corn/DKC4351",
            r#"<h1>DKC4351</h1><p>ФАО: 350</p>"#,
        )
}

/// A UA corn item with text attributes and `key: value` evidence
pub fn item(name: &str, attributes: &[(&str, &str)]) -> Item {
    Item {
        crop: Some("corn".to_string()),
        name: name.to_string(),
        market: "UA".to_string(),
        brand: Some("DEKALB (Bayer)".to_string()),
        source_url: format!("{BASE}/Products/Dekalb/Corn/{name}"),
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

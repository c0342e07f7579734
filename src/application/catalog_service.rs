//! Catalog service facade
//!
//! Entry point for the outer surfaces (CLI, future HTTP layer): catalog reads,
//! the sources overview, asynchronous update jobs, manual import and the
//! fallback snapshot.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

use crate::application::reconciler::{ReconcileCounts, Reconciler};
use crate::application::update_job::UpdateJobRunner;
use crate::application::{JobStore, SourceRegistry};
use crate::domain::{CatalogSnapshot, Item, Run, SourcesOverview, UpdateRequest};
use crate::infrastructure::{
    AppConfig, CatalogRepository, CatalogResult, DatabaseConnection, HttpClient, PageFetcher,
    RunRepository, SnapshotWriter,
};

/// Outcome of a manual import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub added: u64,
    pub updated: u64,
    pub unchanged: u64,
    /// Entries without a name, never stored
    pub rejected: u64,
}

/// Accepted manual-import documents: a bare array or `{ "items": [...] }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImportPayload {
    Items(Vec<Item>),
    Wrapped { items: Vec<Item> },
}

/// Parse a manual-import JSON document into items
pub fn parse_import_payload(json: &str) -> serde_json::Result<Vec<Item>> {
    Ok(match serde_json::from_str::<ImportPayload>(json)? {
        ImportPayload::Items(items) | ImportPayload::Wrapped { items } => items,
    })
}

#[derive(Clone)]
pub struct CatalogService {
    catalog: CatalogRepository,
    runs: RunRepository,
    reconciler: Reconciler,
    jobs: JobStore,
    registry: SourceRegistry,
    snapshot: SnapshotWriter,
    runner: UpdateJobRunner,
}

impl CatalogService {
    /// Build the service over a migrated database and write the startup snapshot
    pub async fn open(
        db: &DatabaseConnection,
        fetcher: Arc<dyn PageFetcher>,
        registry: SourceRegistry,
        snapshot: SnapshotWriter,
    ) -> CatalogResult<Self> {
        let catalog = CatalogRepository::new(db.pool().clone());
        let runs = RunRepository::new(db.pool().clone());
        let jobs = JobStore::new();
        let runner = UpdateJobRunner::new(
            jobs.clone(),
            catalog.clone(),
            runs.clone(),
            registry.clone(),
            fetcher,
            snapshot.clone(),
        );

        let service = Self {
            reconciler: Reconciler::new(catalog.clone()),
            catalog,
            runs,
            jobs,
            registry,
            snapshot,
            runner,
        };
        service.write_snapshot().await?;
        Ok(service)
    }

    /// Wire the service from configuration with the real HTTP fetcher
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let db = DatabaseConnection::with_config(&config.database).await?;
        db.migrate().await?;
        let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpClient::with_config(config.http.clone())?);
        let registry = SourceRegistry::standard()?;
        let snapshot = SnapshotWriter::new(config.snapshot.path.clone());

        Self::open(&db, fetcher, registry, snapshot)
            .await
            .context("Failed to open catalog service")
    }

    /// Register a run and start its worker; returns the job id immediately
    pub async fn request_update(&self, request: UpdateRequest) -> CatalogResult<String> {
        let job_id = Uuid::new_v4().to_string();
        let run = Run::start(&job_id);
        self.jobs.register(run.clone()).await;
        self.runs.save(&run).await?;

        info!(
            job_id = %job_id,
            "🚀 Update requested: sources={:?} markets={:?} dry_run={}",
            request.sources,
            request.markets,
            request.dry_run
        );

        let runner = self.runner.clone();
        let worker_job_id = job_id.clone();
        tokio::spawn(async move {
            if let Err(e) = runner.execute(&worker_job_id, &request).await {
                error!(job_id = %worker_job_id, "Update job failed: {}", e);
            }
        });

        Ok(job_id)
    }

    /// Current state of a job: in-memory first, then persisted history
    pub async fn poll_update(&self, job_id: &str) -> CatalogResult<Option<Run>> {
        if let Some(run) = self.jobs.get(job_id).await {
            return Ok(Some(run));
        }
        self.runs.find(job_id).await
    }

    /// Poll until the job completes; `None` if the id is unknown
    pub async fn wait_for_update(
        &self,
        job_id: &str,
        interval: Duration,
    ) -> CatalogResult<Option<Run>> {
        loop {
            match self.poll_update(job_id).await? {
                Some(run) if run.is_terminal() => return Ok(Some(run)),
                Some(_) => tokio::time::sleep(interval).await,
                None => return Ok(None),
            }
        }
    }

    pub async fn read_catalog(&self) -> CatalogResult<CatalogSnapshot> {
        self.catalog.read_catalog().await
    }

    /// Registry entries plus the most recent persisted run
    pub async fn list_sources(&self) -> CatalogResult<SourcesOverview> {
        let latest_run = self.runs.latest().await?.map(|run| run.summary());
        Ok(SourcesOverview {
            sources: self.registry.descriptors().to_vec(),
            latest_run,
        })
    }

    /// Reconcile items supplied directly, then regenerate the snapshot
    pub async fn manual_import(&self, items: Vec<Item>) -> CatalogResult<ImportReport> {
        let total = items.len();
        let accepted: Vec<Item> = items.into_iter().filter(Item::has_name).collect();
        let rejected = (total - accepted.len()) as u64;

        let ReconcileCounts {
            added,
            updated,
            unchanged,
        } = self.reconciler.reconcile(&accepted).await?;
        self.write_snapshot().await?;

        info!(
            "📥 Manual import: added={} updated={} unchanged={} rejected={}",
            added, updated, unchanged, rejected
        );
        Ok(ImportReport {
            added,
            updated,
            unchanged,
            rejected,
        })
    }

    /// Regenerate the fallback snapshot from the store
    pub async fn write_snapshot(&self) -> CatalogResult<CatalogSnapshot> {
        let snapshot = self.catalog.read_catalog().await?;
        self.snapshot.write(&snapshot).await?;
        Ok(snapshot)
    }

    pub fn snapshot_path(&self) -> &std::path::Path {
        self.snapshot.path()
    }
}

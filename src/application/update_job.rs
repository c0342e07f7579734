//! Update-job driver
//!
//! Runs the requested sources one after another and records progress as
//! human-readable log lines plus counters on the job's [`Run`]. Every log line
//! is persisted immediately, so pollers and post-mortem readers see the same
//! state as the worker.
//!
//! Failures of one source are logged, counted in `errors` and the run moves
//! on. Failing to persist the run itself is fatal: the driver stops, closes
//! the run as best it can and hands the error back to the worker.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::application::reconciler::{ReconcileCounts, Reconciler};
use crate::application::source_crawler::{CatalogCrawler, PageFailure, SourceError};
use crate::application::{JobStore, SourceRegistry};
use crate::domain::{RunCounts, SourceDescriptor, UpdateRequest};
use crate::infrastructure::{
    CatalogError, CatalogRepository, CatalogResult, PageFetcher, RunRepository, SnapshotWriter,
};

/// Result of one source: the outer error is fatal, the inner one is not
type SourceStep = CatalogResult<Result<(), SourceError>>;

/// Everything a worker needs to execute update jobs
#[derive(Clone)]
pub struct UpdateJobRunner {
    jobs: JobStore,
    runs: RunRepository,
    catalog: CatalogRepository,
    reconciler: Reconciler,
    registry: SourceRegistry,
    fetcher: Arc<dyn PageFetcher>,
    snapshot: SnapshotWriter,
}

impl UpdateJobRunner {
    pub fn new(
        jobs: JobStore,
        catalog: CatalogRepository,
        runs: RunRepository,
        registry: SourceRegistry,
        fetcher: Arc<dyn PageFetcher>,
        snapshot: SnapshotWriter,
    ) -> Self {
        Self {
            jobs,
            runs,
            reconciler: Reconciler::new(catalog.clone()),
            catalog,
            registry,
            fetcher,
            snapshot,
        }
    }

    /// Execute a registered job to completion
    pub async fn execute(&self, job_id: &str, request: &UpdateRequest) -> CatalogResult<()> {
        let result = self.drive(job_id, request).await;
        if let Err(fatal) = &result {
            self.abort(job_id, fatal).await;
        }
        result
    }

    async fn drive(&self, job_id: &str, request: &UpdateRequest) -> CatalogResult<()> {
        self.log(job_id, "Starting catalog sync job.").await?;

        let mut selected: Vec<&SourceDescriptor> = Vec::new();
        for source_id in &request.sources {
            match self.registry.get(source_id) {
                None => {
                    self.log(job_id, format!("Source {source_id} is not registered."))
                        .await?;
                }
                Some(source) if !source.enabled => {
                    let reason = source.reason.as_deref().unwrap_or("no reason given");
                    self.log(job_id, format!("Source {} disabled: {}", source.id, reason))
                        .await?;
                }
                Some(source) if !request.wants_market(&source.market) => {
                    self.log(
                        job_id,
                        format!(
                            "Source {} skipped: market {} not requested.",
                            source.id, source.market
                        ),
                    )
                    .await?;
                }
                Some(source) => {
                    if !selected.iter().any(|s| s.id == source.id) {
                        selected.push(source);
                    }
                }
            }
        }

        if selected.is_empty() {
            self.log(job_id, "No enabled sources. Nothing fetched.").await?;
            return self.finish(job_id).await;
        }

        for source in selected {
            if let Err(failure) = self.run_source(job_id, source, request.dry_run).await? {
                warn!(job_id = %job_id, source = %source.id, "Source failed: {}", failure);
                self.add_counts(job_id, |counts| counts.errors += 1).await;
                self.log(job_id, format!("Source {} failed: {}", source.id, failure))
                    .await?;
            }
        }

        self.finish(job_id).await
    }

    async fn run_source(
        &self,
        job_id: &str,
        source: &SourceDescriptor,
        dry_run: bool,
    ) -> SourceStep {
        let Some(strategy) = self.registry.strategy(&source.id) else {
            self.log(
                job_id,
                format!("Source {} currently has no scraper implementation.", source.id),
            )
            .await?;
            return Ok(Ok(()));
        };

        self.log(job_id, format!("Fetching {} start page.", source.id))
            .await?;
        let crawler = match CatalogCrawler::new(self.fetcher.clone(), strategy) {
            Ok(crawler) => crawler,
            Err(e) => return Ok(Err(e)),
        };

        let catalog_urls = match crawler.catalog_pages().await {
            Ok(urls) => urls,
            Err(e) => return Ok(Err(e)),
        };
        self.log(
            job_id,
            format!("Discovered catalog pages: {}", catalog_urls.len()),
        )
        .await?;

        let (product_urls, failures) = crawler.product_pages(&catalog_urls).await;
        self.log_failures(job_id, "catalog", &failures).await?;
        let discovered = product_urls.len() as u64;
        self.add_counts(job_id, |counts| counts.discovered += discovered)
            .await;
        self.log(
            job_id,
            format!("Discovered product pages: {}", product_urls.len()),
        )
        .await?;

        let (items, failures) = crawler.extract_items(&product_urls).await;
        self.log_failures(job_id, "product", &failures).await?;
        let parsed = items.len() as u64;
        self.add_counts(job_id, |counts| counts.parsed += parsed).await;
        self.log(job_id, format!("Parsed products: {}", items.len()))
            .await?;

        if dry_run {
            self.log(job_id, "Dry-run enabled. Skipping database writes.")
                .await?;
            return Ok(Ok(()));
        }

        let mut changes = ReconcileCounts::default();
        let reconciled = self.reconciler.reconcile_into(&items, &mut changes).await;
        self.add_counts(job_id, |counts| {
            counts.added += changes.added;
            counts.updated += changes.updated;
            counts.unchanged += changes.unchanged;
        })
        .await;
        if let Err(e) = reconciled {
            return Ok(Err(SourceError::Store(e)));
        }
        self.log(
            job_id,
            format!(
                "DB changes: added={} updated={} unchanged={}",
                changes.added, changes.updated, changes.unchanged
            ),
        )
        .await?;

        Ok(Ok(()))
    }

    async fn log_failures(
        &self,
        job_id: &str,
        kind: &str,
        failures: &[PageFailure],
    ) -> CatalogResult<()> {
        for failure in failures {
            self.log(
                job_id,
                format!("Skipped {kind} page {}: {}", failure.url, failure.error),
            )
            .await?;
        }
        Ok(())
    }

    /// Append a log line to the run and persist the run
    async fn log(&self, job_id: &str, message: impl Into<String>) -> CatalogResult<()> {
        let message = message.into();
        info!(job_id = %job_id, "{}", message);
        if let Some(run) = self
            .jobs
            .update(job_id, |run| run.push_log(message))
            .await
        {
            self.runs.save(&run).await?;
        }
        Ok(())
    }

    async fn add_counts<F>(&self, job_id: &str, apply: F)
    where
        F: FnOnce(&mut RunCounts),
    {
        self.jobs.update(job_id, |run| apply(&mut run.counts)).await;
    }

    /// Persist the completed run, regenerate the snapshot, then publish completion.
    ///
    /// In-memory pollers only see `completed` once both writes are done.
    async fn finish(&self, job_id: &str) -> CatalogResult<()> {
        let completed = self.jobs.get(job_id).await.map(|mut run| {
            run.complete();
            run
        });
        if let Some(run) = &completed {
            self.runs.save(run).await?;
        }

        let snapshot = self.catalog.read_catalog().await?;
        self.snapshot.write(&snapshot).await?;

        if let Some(run) = completed {
            info!(
                job_id = %job_id,
                "✅ Catalog sync finished: discovered={} parsed={} added={} updated={} unchanged={} errors={}",
                run.counts.discovered,
                run.counts.parsed,
                run.counts.added,
                run.counts.updated,
                run.counts.unchanged,
                run.counts.errors
            );
            self.jobs.update(job_id, move |current| *current = run).await;
        }
        Ok(())
    }

    /// Best-effort close of a run after a fatal error
    async fn abort(&self, job_id: &str, fatal: &CatalogError) {
        error!(job_id = %job_id, "❌ Catalog sync aborted: {}", fatal);
        let run = self
            .jobs
            .update(job_id, |run| {
                run.counts.errors += 1;
                run.push_log(format!("Run aborted: {fatal}"));
                if !run.is_terminal() {
                    run.complete();
                }
            })
            .await;
        if let Some(run) = run {
            if let Err(e) = self.runs.save(&run).await {
                warn!(job_id = %job_id, "Could not persist aborted run: {}", e);
            }
        }
    }
}

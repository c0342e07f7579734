//! Persistence for update-job runs
//!
//! Logs and counters are stored as JSON text columns. A run is upserted on
//! every state change so a reader always sees its latest persisted state.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::domain::{Run, RunCounts, RunLogEntry, RunStatus};
use crate::infrastructure::catalog_error::{CatalogError, CatalogResult};

#[derive(Clone)]
pub struct RunRepository {
    pool: SqlitePool,
}

impl RunRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or replace the row keyed by `job_id`
    pub async fn save(&self, run: &Run) -> CatalogResult<()> {
        let logs_json = serde_json::to_string(&run.step_logs)?;
        let counts_json = serde_json::to_string(&run.counts)?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO runs
            (job_id, started_at, finished_at, status, logs_json, counts_json)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&run.job_id)
        .bind(run.started_at)
        .bind(run.finished_at)
        .bind(run.status.as_str())
        .bind(logs_json)
        .bind(counts_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find(&self, job_id: &str) -> CatalogResult<Option<Run>> {
        let row = sqlx::query(
            "SELECT job_id, started_at, finished_at, status, logs_json, counts_json FROM runs WHERE job_id = ?",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(run_from_row).transpose()
    }

    /// Most recently started run, if any run was ever persisted
    pub async fn latest(&self) -> CatalogResult<Option<Run>> {
        let row = sqlx::query(
            r#"
            SELECT job_id, started_at, finished_at, status, logs_json, counts_json
            FROM runs ORDER BY started_at DESC LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(run_from_row).transpose()
    }
}

fn run_from_row(row: &SqliteRow) -> CatalogResult<Run> {
    let status_text: String = row.get("status");
    let status = status_text
        .parse::<RunStatus>()
        .map_err(|_| CatalogError::CorruptRow {
            table: "runs",
            column: "status",
            value: status_text.clone(),
        })?;

    let logs_json: String = row.get("logs_json");
    let counts_json: String = row.get("counts_json");
    let step_logs: Vec<RunLogEntry> = serde_json::from_str(&logs_json)?;
    let counts: RunCounts = serde_json::from_str(&counts_json)?;
    let started_at: DateTime<Utc> = row.get("started_at");
    let finished_at: Option<DateTime<Utc>> = row.get("finished_at");

    Ok(Run {
        job_id: row.get("job_id"),
        status,
        step_logs,
        started_at,
        finished_at,
        counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::DatabaseConnection;
    use anyhow::Result;
    use tempfile::{tempdir, TempDir};

    async fn setup() -> Result<(TempDir, RunRepository)> {
        let dir = tempdir()?;
        let url = format!("sqlite:{}", dir.path().join("runs.db").display());
        let db = DatabaseConnection::new(&url).await?;
        db.migrate().await?;
        Ok((dir, RunRepository::new(db.pool().clone())))
    }

    #[tokio::test]
    async fn test_save_replaces_existing_row() -> Result<()> {
        let (_dir, repo) = setup().await?;
        let mut run = Run::start("job-a");
        run.push_log("Starting catalog sync job.");
        repo.save(&run).await?;

        run.counts.added = 3;
        run.push_log("Catalog sync finished.");
        run.complete();
        repo.save(&run).await?;

        let stored = repo.find("job-a").await?.expect("run persisted");
        assert_eq!(stored.status, RunStatus::Completed);
        assert_eq!(stored.counts.added, 3);
        assert_eq!(stored.step_logs.len(), 2);
        assert!(stored.finished_at.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_latest_returns_newest_run() -> Result<()> {
        let (_dir, repo) = setup().await?;
        assert!(repo.latest().await?.is_none());

        let mut older = Run::start("older");
        older.started_at = Utc::now() - chrono::Duration::minutes(5);
        repo.save(&older).await?;
        repo.save(&Run::start("newer")).await?;

        let latest = repo.latest().await?.expect("latest run");
        assert_eq!(latest.job_id, "newer");
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_job_is_none() -> Result<()> {
        let (_dir, repo) = setup().await?;
        assert!(repo.find("missing").await?.is_none());
        Ok(())
    }
}

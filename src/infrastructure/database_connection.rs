// Database connection and pool management
// This module handles SQLite database connections using sqlx

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::infrastructure::config::{defaults, DatabaseConfig};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS hybrids (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        crop TEXT,
        name TEXT NOT NULL,
        brand TEXT,
        market TEXT NOT NULL,
        source_url TEXT NOT NULL,
        last_seen TEXT NOT NULL,
        last_updated TEXT NOT NULL,
        UNIQUE (name, market, source_url)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS attributes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        hybrid_id INTEGER NOT NULL,
        key TEXT NOT NULL,
        value TEXT,
        evidence TEXT,
        evidence_hash TEXT,
        selector TEXT,
        source_url TEXT NOT NULL,
        extracted_at TEXT NOT NULL,
        FOREIGN KEY (hybrid_id) REFERENCES hybrids (id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS runs (
        job_id TEXT PRIMARY KEY,
        started_at TEXT NOT NULL,
        finished_at TEXT,
        status TEXT NOT NULL,
        logs_json TEXT NOT NULL,
        counts_json TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_attributes_hybrid_id ON attributes (hybrid_id)",
    "CREATE INDEX IF NOT EXISTS idx_hybrids_crop_name ON hybrids (crop, name)",
    "CREATE INDEX IF NOT EXISTS idx_runs_started_at ON runs (started_at)",
];

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::with_config(&DatabaseConfig {
            url: database_url.to_string(),
            max_connections: defaults::DB_MAX_CONNECTIONS,
            busy_timeout_seconds: defaults::DB_BUSY_TIMEOUT_SECONDS,
        })
        .await
    }

    pub async fn with_config(config: &DatabaseConfig) -> Result<Self> {
        let database_url = config.url.as_str();

        // Create database file directory if it doesn't exist
        let db_path = database_url
            .trim_start_matches("sqlite://")
            .trim_start_matches("sqlite:")
            .split('?')
            .next()
            .unwrap_or_default();

        if !db_path.contains(":memory:") {
            if let Some(parent) = Path::new(db_path).parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .with_context(|| {
                            format!("Failed to create database directory {:?}", parent)
                        })?;
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {database_url}"))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(config.busy_timeout_seconds))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database {database_url}"))?;

        info!("🗄️ Connected to catalog database: {}", database_url);
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the three catalog tables if they are missing
    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to apply catalog schema")?;
        }
        Ok(())
    }
}

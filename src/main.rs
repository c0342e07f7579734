//! Parostok Catalog command line front end

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use parostok_catalog::application::parse_import_payload;
use parostok_catalog::infrastructure::init_logging_with_config;
use parostok_catalog::{CatalogService, ConfigManager, UpdateRequest};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "parostok-catalog")]
#[command(about = "Seed hybrid catalog crawler with per-field provenance")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "PAROSTOK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an update job and follow its log until it completes
    Update {
        /// Market to include (repeatable); defaults to UA and US
        #[arg(short, long = "market")]
        markets: Vec<String>,

        /// Source id to run (repeatable); defaults to every registered source
        #[arg(short, long = "source")]
        sources: Vec<String>,

        /// Discover and parse without writing to the catalog
        #[arg(long)]
        dry_run: bool,
    },

    /// Show a job's state
    Status {
        job_id: String,
    },

    /// Print the catalog grouped by crop
    Catalog,

    /// Print registered sources and the latest run
    Sources,

    /// Reconcile items from a JSON file
    Import {
        /// JSON array of items, or an object with an `items` array
        file: PathBuf,
    },

    /// Regenerate the fallback snapshot file
    Snapshot,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };
    let config = config_manager.load_config().await?;
    init_logging_with_config(&config.logging)?;
    info!("Using configuration {:?}", config_manager.config_path());

    let service = CatalogService::from_config(&config).await?;

    match cli.command {
        Commands::Update {
            markets,
            sources,
            dry_run,
        } => {
            let defaults = UpdateRequest::default();
            let request = UpdateRequest {
                markets: if markets.is_empty() { defaults.markets } else { markets },
                sources: if sources.is_empty() { defaults.sources } else { sources },
                dry_run,
            };
            follow_update(&service, request).await?;
        }
        Commands::Status { job_id } => match service.poll_update(&job_id).await? {
            Some(run) => println!("{}", serde_json::to_string_pretty(&run)?),
            None => println!("not_found"),
        },
        Commands::Catalog => {
            let catalog = service.read_catalog().await?;
            println!("{}", serde_json::to_string_pretty(&catalog)?);
        }
        Commands::Sources => {
            let overview = service.list_sources().await?;
            println!("{}", serde_json::to_string_pretty(&overview)?);
        }
        Commands::Import { file } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read import file {file:?}"))?;
            let items = parse_import_payload(&text)
                .with_context(|| format!("Invalid import file {file:?}"))?;
            let report = service.manual_import(items).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Snapshot => {
            let snapshot = service.write_snapshot().await?;
            println!(
                "Wrote {} hybrids to {}",
                snapshot.hybrid_count(),
                service.snapshot_path().display()
            );
        }
    }

    Ok(())
}

/// Start an update and print log lines as they appear
async fn follow_update(service: &CatalogService, request: UpdateRequest) -> Result<()> {
    let job_id = service.request_update(request).await?;
    println!("job_id: {job_id}");

    let mut printed = 0;
    loop {
        let Some(run) = service.poll_update(&job_id).await? else {
            anyhow::bail!("job {job_id} disappeared");
        };
        for entry in run.step_logs.iter().skip(printed) {
            println!("[{}] {}", entry.time.format("%H:%M:%S"), entry.message);
        }
        printed = run.step_logs.len();

        if run.is_terminal() {
            println!("status: {}", run.status);
            println!("{}", serde_json::to_string_pretty(&run.counts)?);
            return Ok(());
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

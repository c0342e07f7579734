//! Configuration infrastructure
//!
//! Contains configuration loading and management for the catalog crawler.
//!
//! Configuration is a single JSON file with four sections:
//! 1. Database connection settings
//! 2. HTTP fetch settings (identification headers, timeout)
//! 3. Fallback snapshot location
//! 4. Logging

#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub http: HttpConfig,
    pub snapshot: SnapshotConfig,
    pub logging: LoggingConfig,
}

/// SQLite store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection URL, e.g. `sqlite:/var/lib/parostok/catalog.db`
    pub url: String,

    pub max_connections: u32,

    /// How long a writer waits on a locked database before giving up
    pub busy_timeout_seconds: u64,
}

/// Page fetch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,

    /// Sent as `Accept-Language` with every request
    pub accept_language: String,

    /// Per-page fetch timeout in seconds
    pub timeout_seconds: u64,

    pub follow_redirects: bool,
}

/// Fallback catalog snapshot settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub path: PathBuf,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs (file output only)
    pub json_format: bool,

    pub console_output: bool,

    pub file_output: bool,

    /// Directory for log files; defaults to `<data dir>/logs`
    pub log_dir: Option<PathBuf>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let db_path = ConfigManager::get_app_data_dir()
            .unwrap_or_else(|_| PathBuf::from("data"))
            .join(defaults::DATABASE_FILE);
        Self {
            url: format!("sqlite:{}", db_path.display()),
            max_connections: defaults::DB_MAX_CONNECTIONS,
            busy_timeout_seconds: defaults::DB_BUSY_TIMEOUT_SECONDS,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::USER_AGENT.to_string(),
            accept_language: defaults::ACCEPT_LANGUAGE.to_string(),
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            follow_redirects: true,
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        let path = ConfigManager::get_app_data_dir()
            .unwrap_or_else(|_| PathBuf::from("data"))
            .join(defaults::SNAPSHOT_FILE);
        Self { path }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: false,
            console_output: true,
            file_output: false,
            log_dir: None,
        }
    }
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join(defaults::APP_DIR_NAME);

        Ok(config_dir)
    }

    /// Get application data directory
    pub fn get_app_data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .context("Failed to get user data directory")?
            .join(defaults::APP_DIR_NAME);

        Ok(data_dir)
    }

    /// Configuration manager pointing at the default per-user config file
    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_dir()?.join(defaults::CONFIG_FILE);
        Ok(Self { config_path })
    }

    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub async fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!("Configuration file not found, creating default: {:?}", self.config_path);
            let default_config = AppConfig::default();
            self.save_config(&default_config).await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .with_context(|| format!("Failed to read configuration file {:?}", self.config_path))?;

        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Invalid configuration file {:?}", self.config_path))?;

        info!("Loaded configuration from: {:?}", self.config_path);
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content =
            serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;

        info!("Saved configuration to: {:?}", self.config_path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

/// Site constants for the DEKALB (Bayer) Ukraine product catalog
pub mod bayer_ua {
    pub const SOURCE_ID: &str = "bayer_ua_dekalb";

    pub const MARKET: &str = "UA";

    pub const BRAND: &str = "DEKALB (Bayer)";

    /// Brand landing page listing the per-crop catalog pages
    pub const START_URL: &str = "https://www.cropscience.bayer.ua/Products/Dekalb";

    /// Path segment every catalog and product page lives under
    pub const CATALOG_MARKER: &str = "/Products/Dekalb/";

    /// Labels and headings as they appear on the Ukrainian product pages
    pub mod labels {
        pub const FAO: &str = "ФАО:";
        pub const GRAIN_TYPE: &str = "Тип зерна:";
        pub const MATURITY_GROUP: &str = "Група стиглості:";
        pub const ADVANTAGES: &str = "ОСНОВНІ ПЕРЕВАГИ";
        pub const POSITIONING: &str = "ПОЗИЦІОНУВАННЯ ГІБРИДА";
        pub const DENSITY: &str = "ГУСТОТА НА ЧАС ЗБИРАННЯ";
        pub const CHARACTERISTICS: &str = "ХАРАКТЕРИСТИКА ГІБРИДА";
    }
}

/// Site constants for the DEKALB (Bayer) US source, which has no crawler
pub mod bayer_us {
    pub const SOURCE_ID: &str = "bayer_us_dekalb";

    pub const MARKET: &str = "US";

    pub const DISABLED_REASON: &str =
        "Network scraping not configured in this starter; use manual import.";
}

/// Default configuration values
pub mod defaults {
    pub const APP_DIR_NAME: &str = "parostok-catalog";

    pub const CONFIG_FILE: &str = "parostok_catalog_config.json";

    pub const DATABASE_FILE: &str = "catalog.db";

    pub const SNAPSHOT_FILE: &str = "catalog_fallback.json";

    pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; ParostokBot/1.0)";

    pub const ACCEPT_LANGUAGE: &str = "uk-UA,uk;q=0.9,en;q=0.8";

    /// Per-page fetch timeout in seconds
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

    pub const DB_MAX_CONNECTIONS: u32 = 8;

    pub const DB_BUSY_TIMEOUT_SECONDS: u64 = 5;

    pub const LOG_LEVEL: &str = "info";
}

//! Source registry metadata and update requests

use serde::{Deserialize, Serialize};

use super::run::RunSummary;

/// Static description of one catalog source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub id: String,
    pub market: String,
    pub enabled: bool,
    /// Human-readable reason, present when the source is disabled
    pub reason: Option<String>,
    pub last_run: Option<String>,
    /// Attribute-key namespaces the source is expected to populate
    pub fields: Vec<String>,
}

/// Registry entries plus the most recent persisted run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcesOverview {
    pub sources: Vec<SourceDescriptor>,
    pub latest_run: Option<RunSummary>,
}

/// Parameters of an update job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    #[serde(default = "default_markets")]
    pub markets: Vec<String>,
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,
    #[serde(default)]
    pub dry_run: bool,
}

fn default_markets() -> Vec<String> {
    vec!["UA".to_string(), "US".to_string()]
}

fn default_sources() -> Vec<String> {
    vec!["bayer_ua_dekalb".to_string(), "bayer_us_dekalb".to_string()]
}

impl Default for UpdateRequest {
    fn default() -> Self {
        Self {
            markets: default_markets(),
            sources: default_sources(),
            dry_run: false,
        }
    }
}

impl UpdateRequest {
    /// An empty market list places no restriction on markets
    pub fn wants_market(&self, market: &str) -> bool {
        self.markets.is_empty() || self.markets.iter().any(|m| m.eq_ignore_ascii_case(market))
    }
}

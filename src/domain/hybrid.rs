//! Catalog entities: hybrids, their evidenced attributes, and in-flight items
//!
//! An [`Item`] is what an extraction strategy (or a manual import) produces.
//! It is consumed once by the reconciler, which turns it into a stored
//! [`Hybrid`] row and a wholesale-replaced set of [`Attribute`] rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Maximum number of characters kept from an evidence snippet
pub const EVIDENCE_MAX_CHARS: usize = 240;

/// Provenance tag for attributes pulled out of flattened page text by label patterns
pub const TEXT_PATTERN_SELECTOR: &str = "regex_on_page_text";

/// Attribute value: free text or a number, never arbitrary structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Number(serde_json::Number),
    Text(String),
}

impl AttributeValue {
    pub fn integer(value: i64) -> Self {
        Self::Number(serde_json::Number::from(value))
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Empty text carries no information and is never stored
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Number(_) => false,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::integer(value)
    }
}

/// One candidate attribute record, before reconciliation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateAttribute {
    /// Dot-namespaced key, e.g. `positioning.Зона вирощування`
    pub key: String,
    pub value: AttributeValue,
    #[serde(default)]
    pub evidence: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_at: Option<DateTime<Utc>>,
}

impl CandidateAttribute {
    pub fn new(key: impl Into<String>, value: AttributeValue, evidence: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value,
            evidence: evidence.into(),
            selector: None,
            source_url: None,
            extracted_at: None,
        }
    }
}

/// Extractor output for one product page (or one manual-import entry)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub crop: Option<String>,
    #[serde(default)]
    pub name: String,
    pub market: String,
    #[serde(default)]
    pub brand: Option<String>,
    pub source_url: String,
    #[serde(default)]
    pub attributes: Vec<CandidateAttribute>,
}

impl Item {
    /// Items without a display name are discarded before reaching the store
    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }

    pub fn identity(&self) -> HybridIdentity<'_> {
        HybridIdentity {
            name: &self.name,
            market: &self.market,
            source_url: &self.source_url,
        }
    }
}

/// Uniqueness key of a hybrid: (name, market, source_url)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HybridIdentity<'a> {
    pub name: &'a str,
    pub market: &'a str,
    pub source_url: &'a str,
}

impl fmt::Display for HybridIdentity<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.name, self.market, self.source_url)
    }
}

/// Stored catalog entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hybrid {
    pub id: i64,
    pub crop: Option<String>,
    pub name: String,
    pub brand: Option<String>,
    pub market: String,
    pub source_url: String,
    pub last_seen: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Stored attribute row, owned by exactly one hybrid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: String,
    pub evidence: String,
    pub evidence_hash: Option<String>,
    pub selector: Option<String>,
    pub source_url: String,
    pub extracted_at: DateTime<Utc>,
}

/// Hybrid together with its full attribute set, as served to catalog readers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridWithAttributes {
    #[serde(flatten)]
    pub hybrid: Hybrid,
    pub attributes: Vec<Attribute>,
}

/// Crop bucket for hybrids whose crop could not be derived
pub const UNCATEGORIZED_CROP: &str = "uncategorized";

/// Full catalog grouped by crop, hybrids ordered by name within a crop
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub crops: BTreeMap<String, Vec<HybridWithAttributes>>,
}

impl CatalogSnapshot {
    pub fn hybrid_count(&self) -> usize {
        self.crops.values().map(Vec::len).sum()
    }

    pub fn find(&self, name: &str) -> Option<&HybridWithAttributes> {
        self.crops
            .values()
            .flatten()
            .find(|entry| entry.hybrid.name == name)
    }
}

/// Truncate an evidence snippet to [`EVIDENCE_MAX_CHARS`] characters
pub fn truncate_evidence(evidence: &str) -> String {
    evidence.chars().take(EVIDENCE_MAX_CHARS).collect()
}

/// Hex digest of an evidence snippet; `None` for empty evidence
pub fn evidence_hash(evidence: &str) -> Option<String> {
    if evidence.is_empty() {
        None
    } else {
        Some(blake3::hash(evidence.as_bytes()).to_hex().to_string())
    }
}

//! Diff/upsert engine for extracted items
//!
//! Each item is reconciled in its own transaction:
//! 1. insert the hybrid if its identity is new (a concurrent duplicate is ignored)
//! 2. fingerprint the incoming attribute set and the stored one
//! 3. equal fingerprints on an existing hybrid only touch `last_seen`
//! 4. anything else replaces the whole attribute set and bumps `last_updated`
//!
//! The insert runs first so the transaction takes SQLite's write lock before
//! it reads anything.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use tracing::{debug, info};

use crate::domain::hybrid::{evidence_hash, truncate_evidence};
use crate::domain::{Attribute, Item, TEXT_PATTERN_SELECTOR};
use crate::infrastructure::{CatalogError, CatalogRepository, CatalogResult};

/// How one item affected the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    Added,
    Updated,
    Unchanged,
}

/// Per-batch classification counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileCounts {
    pub added: u64,
    pub updated: u64,
    pub unchanged: u64,
}

impl ReconcileCounts {
    pub fn record(&mut self, outcome: Reconciliation) {
        match outcome {
            Reconciliation::Added => self.added += 1,
            Reconciliation::Updated => self.updated += 1,
            Reconciliation::Unchanged => self.unchanged += 1,
        }
    }
}

impl AddAssign for ReconcileCounts {
    fn add_assign(&mut self, other: Self) {
        self.added += other.added;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
    }
}

/// Digest of an attribute set given as `(key, value, evidence)` triples.
///
/// Triples are sorted before hashing, so the order they arrive in does not
/// matter.
pub fn fingerprint(mut triples: Vec<(String, String, String)>) -> CatalogResult<String> {
    triples.sort();
    let canonical = serde_json::to_vec(&triples)?;
    Ok(blake3::hash(&canonical).to_hex().to_string())
}

/// Attribute rows to store for an item.
///
/// Empty values are dropped, evidence is truncated, and missing provenance is
/// filled from the item and the reconcile time.
pub fn normalize_attributes(item: &Item, now: DateTime<Utc>) -> Vec<Attribute> {
    item.attributes
        .iter()
        .filter(|candidate| !candidate.value.is_empty())
        .map(|candidate| {
            let evidence = truncate_evidence(&candidate.evidence);
            Attribute {
                key: candidate.key.clone(),
                value: candidate.value.to_string(),
                evidence_hash: evidence_hash(&evidence),
                evidence,
                selector: Some(
                    candidate
                        .selector
                        .clone()
                        .unwrap_or_else(|| TEXT_PATTERN_SELECTOR.to_string()),
                ),
                source_url: candidate
                    .source_url
                    .clone()
                    .unwrap_or_else(|| item.source_url.clone()),
                extracted_at: candidate.extracted_at.unwrap_or(now),
            }
        })
        .collect()
}

fn triples(attributes: &[Attribute]) -> Vec<(String, String, String)> {
    attributes
        .iter()
        .map(|a| (a.key.clone(), a.value.clone(), a.evidence.clone()))
        .collect()
}

/// Applies extracted items to the catalog store
#[derive(Clone)]
pub struct Reconciler {
    repository: CatalogRepository,
}

impl Reconciler {
    pub fn new(repository: CatalogRepository) -> Self {
        Self { repository }
    }

    /// Reconcile one item atomically
    pub async fn reconcile_item(&self, item: &Item) -> CatalogResult<Reconciliation> {
        if !item.has_name() {
            return Err(CatalogError::InvalidItem {
                identity: item.identity().to_string(),
                reason: "item has no name".to_string(),
            });
        }

        let now = Utc::now();
        let attributes = normalize_attributes(item, now);
        let new_fingerprint = fingerprint(triples(&attributes))?;

        let mut tx = self.repository.begin().await?;

        let inserted = CatalogRepository::insert_hybrid_if_absent(&mut tx, item, now).await?;
        let hybrid_id = CatalogRepository::find_hybrid_id(&mut tx, item.identity())
            .await?
            .ok_or_else(|| CatalogError::InvalidItem {
                identity: item.identity().to_string(),
                reason: "hybrid row missing after insert".to_string(),
            })?;

        let stored = CatalogRepository::attribute_triples(&mut tx, hybrid_id).await?;
        let stored_fingerprint = fingerprint(stored)?;

        let outcome = if !inserted && stored_fingerprint == new_fingerprint {
            CatalogRepository::touch_last_seen(&mut tx, hybrid_id, now).await?;
            Reconciliation::Unchanged
        } else {
            CatalogRepository::mark_updated(&mut tx, hybrid_id, now).await?;
            CatalogRepository::replace_attributes(&mut tx, hybrid_id, &attributes).await?;
            if inserted {
                Reconciliation::Added
            } else {
                Reconciliation::Updated
            }
        };

        tx.commit().await?;

        debug!("{:?}: {}", outcome, item.identity());
        Ok(outcome)
    }

    /// Reconcile a batch in order, stopping at the first store failure
    pub async fn reconcile(&self, items: &[Item]) -> CatalogResult<ReconcileCounts> {
        let mut counts = ReconcileCounts::default();
        self.reconcile_into(items, &mut counts).await?;
        Ok(counts)
    }

    /// Like [`Reconciler::reconcile`], but records each committed item into
    /// `counts` as it goes, so a failure part way through keeps the earlier
    /// outcomes.
    pub async fn reconcile_into(
        &self,
        items: &[Item],
        counts: &mut ReconcileCounts,
    ) -> CatalogResult<()> {
        for item in items {
            counts.record(self.reconcile_item(item).await?);
        }
        info!(
            "📦 Reconciled {} items: added={} updated={} unchanged={}",
            items.len(),
            counts.added,
            counts.updated,
            counts.unchanged
        );
        Ok(())
    }
}

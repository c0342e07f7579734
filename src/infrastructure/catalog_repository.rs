//! Repository for hybrids and their attribute sets
//!
//! Write primitives take a `&mut SqliteConnection` so the reconciler can run
//! them inside one transaction per hybrid. Reads go through the pool, one
//! short-lived connection per call.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::collections::HashMap;

use crate::domain::{
    Attribute, CatalogSnapshot, Hybrid, HybridIdentity, HybridWithAttributes, Item,
    UNCATEGORIZED_CROP,
};
use crate::infrastructure::catalog_error::CatalogResult;

/// Repository over the `hybrids` and `attributes` tables
#[derive(Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Open the transaction that scopes one hybrid's reconciliation
    pub async fn begin(&self) -> CatalogResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    // ===============================
    // TRANSACTIONAL WRITE PRIMITIVES
    // ===============================

    /// Insert the hybrid unless its identity already exists.
    ///
    /// Returns `true` when a new row was created. A concurrent insert of the
    /// same identity is ignored rather than reported.
    pub async fn insert_hybrid_if_absent(
        conn: &mut SqliteConnection,
        item: &Item,
        now: DateTime<Utc>,
    ) -> CatalogResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO hybrids
            (crop, name, brand, market, source_url, last_seen, last_updated)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&item.crop)
        .bind(&item.name)
        .bind(&item.brand)
        .bind(&item.market)
        .bind(&item.source_url)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_hybrid_id(
        conn: &mut SqliteConnection,
        identity: HybridIdentity<'_>,
    ) -> CatalogResult<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM hybrids WHERE name = ? AND market = ? AND source_url = ?",
        )
        .bind(identity.name)
        .bind(identity.market)
        .bind(identity.source_url)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(id)
    }

    /// Stored (key, value, evidence) triples of a hybrid, as fingerprint input
    pub async fn attribute_triples(
        conn: &mut SqliteConnection,
        hybrid_id: i64,
    ) -> CatalogResult<Vec<(String, String, String)>> {
        let rows = sqlx::query("SELECT key, value, evidence FROM attributes WHERE hybrid_id = ?")
            .bind(hybrid_id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let value: Option<String> = row.get("value");
                let evidence: Option<String> = row.get("evidence");
                (
                    row.get("key"),
                    value.unwrap_or_default(),
                    evidence.unwrap_or_default(),
                )
            })
            .collect())
    }

    pub async fn touch_last_seen(
        conn: &mut SqliteConnection,
        hybrid_id: i64,
        now: DateTime<Utc>,
    ) -> CatalogResult<()> {
        sqlx::query("UPDATE hybrids SET last_seen = ? WHERE id = ?")
            .bind(now)
            .bind(hybrid_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn mark_updated(
        conn: &mut SqliteConnection,
        hybrid_id: i64,
        now: DateTime<Utc>,
    ) -> CatalogResult<()> {
        sqlx::query("UPDATE hybrids SET last_seen = ?, last_updated = ? WHERE id = ?")
            .bind(now)
            .bind(now)
            .bind(hybrid_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Delete every attribute of the hybrid and insert the new set
    pub async fn replace_attributes(
        conn: &mut SqliteConnection,
        hybrid_id: i64,
        attributes: &[Attribute],
    ) -> CatalogResult<()> {
        sqlx::query("DELETE FROM attributes WHERE hybrid_id = ?")
            .bind(hybrid_id)
            .execute(&mut *conn)
            .await?;

        for attribute in attributes {
            sqlx::query(
                r#"
                INSERT INTO attributes
                (hybrid_id, key, value, evidence, evidence_hash, selector, source_url, extracted_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(hybrid_id)
            .bind(&attribute.key)
            .bind(&attribute.value)
            .bind(&attribute.evidence)
            .bind(&attribute.evidence_hash)
            .bind(&attribute.selector)
            .bind(&attribute.source_url)
            .bind(attribute.extracted_at)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    // ===============================
    // READS
    // ===============================

    pub async fn find_hybrid(&self, identity: HybridIdentity<'_>) -> CatalogResult<Option<Hybrid>> {
        let row = sqlx::query(
            r#"
            SELECT id, crop, name, brand, market, source_url, last_seen, last_updated
            FROM hybrids WHERE name = ? AND market = ? AND source_url = ?
            "#,
        )
        .bind(identity.name)
        .bind(identity.market)
        .bind(identity.source_url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(hybrid_from_row))
    }

    /// Attribute rows of one hybrid in insertion order
    pub async fn attributes_for(&self, hybrid_id: i64) -> CatalogResult<Vec<Attribute>> {
        let rows = sqlx::query(
            r#"
            SELECT key, value, evidence, evidence_hash, selector, source_url, extracted_at
            FROM attributes WHERE hybrid_id = ? ORDER BY id
            "#,
        )
        .bind(hybrid_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(attribute_from_row).collect())
    }

    pub async fn count_hybrids(&self) -> CatalogResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM hybrids")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Whole catalog grouped by crop, ordered by (crop, name)
    pub async fn read_catalog(&self) -> CatalogResult<CatalogSnapshot> {
        let hybrid_rows = sqlx::query(
            r#"
            SELECT id, crop, name, brand, market, source_url, last_seen, last_updated
            FROM hybrids ORDER BY crop, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let attribute_rows = sqlx::query(
            r#"
            SELECT hybrid_id, key, value, evidence, evidence_hash, selector, source_url, extracted_at
            FROM attributes ORDER BY hybrid_id, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut attributes_by_hybrid: HashMap<i64, Vec<Attribute>> = HashMap::new();
        for row in &attribute_rows {
            attributes_by_hybrid
                .entry(row.get("hybrid_id"))
                .or_default()
                .push(attribute_from_row(row));
        }

        let mut snapshot = CatalogSnapshot::default();
        for row in &hybrid_rows {
            let hybrid = hybrid_from_row(row);
            let crop = hybrid
                .crop
                .clone()
                .unwrap_or_else(|| UNCATEGORIZED_CROP.to_string());
            let attributes = attributes_by_hybrid.remove(&hybrid.id).unwrap_or_default();
            snapshot
                .crops
                .entry(crop)
                .or_default()
                .push(HybridWithAttributes { hybrid, attributes });
        }

        Ok(snapshot)
    }
}

fn hybrid_from_row(row: &SqliteRow) -> Hybrid {
    Hybrid {
        id: row.get("id"),
        crop: row.get("crop"),
        name: row.get("name"),
        brand: row.get("brand"),
        market: row.get("market"),
        source_url: row.get("source_url"),
        last_seen: row.get("last_seen"),
        last_updated: row.get("last_updated"),
    }
}

fn attribute_from_row(row: &SqliteRow) -> Attribute {
    let value: Option<String> = row.get("value");
    let evidence: Option<String> = row.get("evidence");
    Attribute {
        key: row.get("key"),
        value: value.unwrap_or_default(),
        evidence: evidence.unwrap_or_default(),
        evidence_hash: row.get("evidence_hash"),
        selector: row.get("selector"),
        source_url: row.get("source_url"),
        extracted_at: row.get("extracted_at"),
    }
}

//! JSON snapshot of the catalog on disk

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::domain::CatalogSnapshot;
use crate::infrastructure::catalog_error::CatalogResult;

/// Writes the grouped catalog as pretty-printed JSON to a fixed path
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    path: PathBuf,
}

impl SnapshotWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the snapshot file with the given catalog
    pub async fn write(&self, snapshot: &CatalogSnapshot) -> CatalogResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(
            "Wrote catalog snapshot with {} hybrids to {:?}",
            snapshot.hybrid_count(),
            self.path
        );
        Ok(())
    }
}

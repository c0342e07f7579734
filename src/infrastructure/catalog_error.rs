//! Store-level error type
//!
//! A `CatalogError` means the catalog store itself could not be read or
//! written. During an update job, a failure to reconcile a source's items
//! fails only that source; a failure to persist the run itself ends the run.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid item {identity}: {reason}")]
    InvalidItem { identity: String, reason: String },

    #[error("corrupt stored value in {table}.{column}: {value}")]
    CorruptRow {
        table: &'static str,
        column: &'static str,
        value: String,
    },
}

pub type CatalogResult<T> = Result<T, CatalogError>;

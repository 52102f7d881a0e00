// Storage errors
use super::db::DatabaseError;
use crate::wire::FormatError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{table} entry not found: {key}")]
    NotFound { table: &'static str, key: String },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Stored bytes no longer decode; never replaced by a default value
    #[error("Corrupt stored value: {0}")]
    Format(#[from] FormatError),
}

//! Storage traits and error types
//!
//! This module defines the trait interface for result stores and the
//! associated error types.

use crate::model::Business;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage is closed")]
    Closed,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for result store implementations
///
/// Implementations serialize access internally; callers share one store
/// across workers behind an `Arc`.
pub trait Storage: Send + Sync {
    /// Inserts a batch of businesses in one transaction
    ///
    /// Rows that collide with an existing `(cid, query)` pair are ignored,
    /// as are individual rows that fail to insert.
    ///
    /// # Returns
    ///
    /// The number of rows actually inserted
    fn insert_batch(&self, businesses: &[Business]) -> StorageResult<usize>;

    /// Total number of stored rows
    fn count(&self) -> StorageResult<u64>;
}

//! Store error types

use thiserror::Error;

/// Error type for relational store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite database error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] sqlx::Error),

    /// IO error (database path creation)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

//! Error types for the raw key-value boundary.

use snafu::Snafu;

/// Result type alias for raw store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by a key-value backend.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// Failed to open the backing database file.
    #[snafu(display("Failed to open database at {path}: {source}"))]
    Open {
        /// Path of the database file.
        path: String,
        /// The underlying redb error.
        source: redb::DatabaseError,
    },

    /// Failed to begin a transaction.
    #[snafu(display("Transaction error: {source}"))]
    Transaction {
        /// The underlying redb error.
        source: redb::TransactionError,
    },

    /// Failed to open the data table.
    #[snafu(display("Table error: {source}"))]
    Table {
        /// The underlying redb error.
        source: redb::TableError,
    },

    /// A read or write against the data table failed.
    #[snafu(display("Storage error: {source}"))]
    Storage {
        /// The underlying redb error.
        source: redb::StorageError,
    },

    /// Failed to commit a write transaction.
    #[snafu(display("Commit error: {source}"))]
    Commit {
        /// The underlying redb error.
        source: redb::CommitError,
    },
}

//! Error types for load operations.

use thiserror::Error;

/// Result type for load operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Errors that can occur while reconciling a dataset into the database.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Target table is missing or introspection yielded no columns.
    #[error("schema lookup failed for table '{table}': {reason}")]
    SchemaLookup {
        /// Table whose schema could not be resolved
        table: String,
        /// Why introspection failed
        reason: String,
    },

    /// Caller-supplied identity or update columns are absent from the
    /// target schema or the candidate dataset. Detected before any
    /// database mutation.
    #[error("these fields are not in the {table} table or dataset: {}", .missing.join(", "))]
    InvalidIdentityColumns {
        /// Table being loaded
        table: String,
        /// All missing column names
        missing: Vec<String>,
    },

    /// An identifier failed validation and cannot be safely interpolated.
    #[error("invalid SQL identifier: '{0}'")]
    InvalidIdentifier(String),

    /// An update was planned with no identity columns to join on.
    #[error("update on table '{table}' requires at least one identity column")]
    EmptyIdentity {
        /// Table being updated
        table: String,
    },

    /// Planning narrowed down to zero usable columns: nothing is shared
    /// between the candidate dataset and the target table (or, for updates,
    /// nothing non-key remains to set).
    #[error("no usable columns remain between the dataset and table '{table}'")]
    NoSharedColumns {
        /// Table being loaded
        table: String,
    },

    /// The planned SQL failed mid-transaction. The transaction was rolled
    /// back and the staging table dropped best-effort before this surfaced.
    #[error("transaction failed while executing `{statement}`: {source}")]
    Transaction {
        /// The statement that failed
        statement: String,
        /// Underlying driver error
        #[source]
        source: sqlx::Error,
    },

    /// Dropping a staging table failed. Logged and reported, but never
    /// allowed to mask the primary outcome of a load operation.
    #[error("failed to drop staging table '{table}': {source}")]
    Cleanup {
        /// Staging table that could not be dropped
        table: String,
        /// Underlying driver error
        #[source]
        source: sqlx::Error,
    },

    /// Connection could not be established within the retry budget.
    #[error("could not connect to database after {attempts} attempts: {source}")]
    Connect {
        /// Number of attempts made
        attempts: u32,
        /// Error from the final attempt
        #[source]
        source: sqlx::Error,
    },

    /// Any other database error outside the planned statement.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// In-memory dataset manipulation failed.
    #[error(transparent)]
    Dataset(#[from] cfbload_core::DatasetError),
}

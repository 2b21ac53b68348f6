//! Error types for load runs.

use thiserror::Error;

/// Result type for load runs.
pub type LoaderResult<T> = Result<T, LoaderError>;

/// Errors that can occur while loading a snapshot.
#[derive(Error, Debug)]
pub enum LoaderError {
    /// A table-level load operation failed. Tables loaded earlier in the
    /// dependency order stay loaded; the run stops here.
    #[error(transparent)]
    Load(#[from] cfbload_sql::LoadError),

    /// In-memory dataset manipulation failed.
    #[error(transparent)]
    Dataset(#[from] cfbload_core::DatasetError),

    /// The snapshot file could not be parsed.
    #[error("failed to parse snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// The snapshot file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration or input error.
    #[error("configuration error: {0}")]
    Config(String),
}

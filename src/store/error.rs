use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by the Block Store.
pub enum StoreError {
    /// Snapshot file exists but could not be read.
    #[error("block store snapshot '{path}' is unreadable: {message}")]
    Unreadable {
        /// Snapshot path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Snapshot file was read but did not parse.
    #[error("block store snapshot '{path}' is corrupt: {message}")]
    Corrupt {
        /// Snapshot path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Persisting the snapshot failed.
    #[error("failed to persist block store to '{path}': {message}")]
    PersistFailed {
        /// Snapshot path.
        path: PathBuf,
        /// Error message.
        message: String,
    },
}

impl StoreError {
    /// `true` for load-time failures the caller may answer by starting from
    /// an empty store.
    pub fn is_recoverable_load(&self) -> bool {
        matches!(
            self,
            StoreError::Unreadable { .. } | StoreError::Corrupt { .. }
        )
    }
}

/// Convenience result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::store::StoreError;
use crate::vectordb::VectorDbError;

#[derive(Debug, Error)]
/// Errors returned by the indexed retriever.
pub enum RetrieverError {
    /// Malformed time window (end precedes start); rejected before querying.
    #[error("invalid time window: end {end} precedes start {start}")]
    InvalidWindow {
        /// Window start.
        start: DateTime<Utc>,
        /// Window end.
        end: DateTime<Utc>,
    },

    /// Embedding generation failed.
    #[error("embedding generation failed: {reason}")]
    EmbeddingFailed {
        /// Error message.
        reason: String,
    },

    /// Vector index error (search/upsert/etc).
    #[error("vector index error: {0}")]
    Index(#[from] VectorDbError),

    /// Block Store persistence failed after a successful index write.
    #[error("block store persistence failed: {0}")]
    Store(#[from] StoreError),

    /// An embedding or index call exceeded the configured timeout.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        /// Which call timed out.
        operation: &'static str,
        /// Configured timeout.
        timeout: Duration,
    },

    /// Invalid configuration.
    #[error("configuration error: {reason}")]
    ConfigError {
        /// Error message.
        reason: String,
    },
}

impl From<EmbeddingError> for RetrieverError {
    fn from(err: EmbeddingError) -> Self {
        RetrieverError::EmbeddingFailed {
            reason: err.to_string(),
        }
    }
}

impl RetrieverError {
    /// `true` for failures where a retry with identical inputs is safe:
    /// indexing is idempotent and append-only, so nothing partial persists.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RetrieverError::EmbeddingFailed { .. }
                | RetrieverError::Index(_)
                | RetrieverError::Store(_)
                | RetrieverError::Timeout { .. }
        )
    }
}

/// Convenience result type for retriever operations.
pub type RetrieverResult<T> = Result<T, RetrieverError>;

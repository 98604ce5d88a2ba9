use std::time::Duration;

use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::vectordb::VectorDbError;

#[derive(Debug, Error)]
/// Errors returned by the semantic response cache.
///
/// Lookup errors never reach callers of `get`: they degrade to a miss so the
/// cache can never block the caller from proceeding to full retrieval.
pub enum CacheError {
    /// A session-scoped write arrived without a session id.
    #[error("session-scoped cache entry requires a session id")]
    MissingSessionId,

    /// Embedding generation failed.
    #[error("embedding generation failed: {reason}")]
    EmbeddingFailed {
        /// Error message.
        reason: String,
    },

    /// Vector index error (search/upsert/etc).
    #[error("vector index error: {0}")]
    Index(#[from] VectorDbError),

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

impl From<EmbeddingError> for CacheError {
    fn from(err: EmbeddingError) -> Self {
        CacheError::EmbeddingFailed {
            reason: err.to_string(),
        }
    }
}

/// Convenience result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

use thiserror::Error;

use crate::cache::CacheError;
use crate::retriever::RetrieverError;

#[derive(Debug, Error)]
/// Errors surfaced at the pipeline boundary.
///
/// The orchestration layer uses [`PipelineError::is_transient`] to pick
/// between "no data found" and "try again" messaging: empty retrieval
/// results arrive as a normal empty list, never as an error.
pub enum PipelineError {
    /// Retrieval-side failure.
    #[error(transparent)]
    Retriever(#[from] RetrieverError),

    /// Cache-side failure.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl PipelineError {
    /// `true` when retrying the same call is reasonable.
    pub fn is_transient(&self) -> bool {
        match self {
            PipelineError::Retriever(err) => err.is_transient(),
            PipelineError::Cache(err) => matches!(
                err,
                CacheError::EmbeddingFailed { .. }
                    | CacheError::Index(_)
                    | CacheError::Timeout { .. }
            ),
        }
    }
}

/// Convenience result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

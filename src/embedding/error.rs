use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The embedding backend reported a failure.
    #[error("embedding inference failed: {reason}")]
    InferenceFailed { reason: String },

    /// The backend returned a different number of vectors than texts.
    #[error("embedding batch shape mismatch: expected {expected} vectors, got {actual}")]
    BatchShapeMismatch { expected: usize, actual: usize },

    /// The backend returned a vector of the wrong dimensionality.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

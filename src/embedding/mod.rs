//! Embedding seam.
//!
//! Embedding computation is an injected capability: the process wires in
//! whatever backend it has (hosted API, local model) behind [`Embedder`].
//! [`StubEmbedder`] exists for tests and examples only.

mod error;
#[cfg(any(test, feature = "mock"))]
mod stub;

pub use error::EmbeddingError;
#[cfg(any(test, feature = "mock"))]
pub use stub::StubEmbedder;

/// Batch text-to-vector capability with a fixed dimensionality across calls.
pub trait Embedder: Send + Sync {
    /// Dimensionality of every vector this embedder produces.
    fn embedding_dim(&self) -> usize;

    /// Embeds `texts`, one vector per text, in order.
    fn embed_batch(
        &self,
        texts: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<Vec<f32>>, EmbeddingError>> + Send;
}

impl<E: Embedder> Embedder for std::sync::Arc<E> {
    fn embedding_dim(&self) -> usize {
        (**self).embedding_dim()
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        (**self).embed_batch(texts).await
    }
}

/// Embeds a single text, enforcing the one-in-one-out batch contract.
pub(crate) async fn embed_single<E: Embedder>(
    embedder: &E,
    text: &str,
) -> Result<Vec<f32>, EmbeddingError> {
    let texts = [text.to_string()];
    let mut vectors = embedder.embed_batch(&texts).await?;

    if vectors.len() != 1 {
        return Err(EmbeddingError::BatchShapeMismatch {
            expected: 1,
            actual: vectors.len(),
        });
    }

    Ok(vectors.remove(0))
}

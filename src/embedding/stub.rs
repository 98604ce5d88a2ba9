//! Deterministic stand-in embedder for tests and examples.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{Embedder, EmbeddingError};

const STUB_EMBEDDING_DIM: usize = 64;

/// Hash-based embedder: identical text always maps to the identical unit
/// vector, distinct texts to (almost certainly) dissimilar ones.
///
/// Tests that need controlled similarity between *different* texts register
/// canned vectors with [`StubEmbedder::with_canned`].
pub struct StubEmbedder {
    dim: usize,
    canned: RwLock<HashMap<String, Vec<f32>>>,
    counts: RwLock<HashMap<String, usize>>,
}

impl Default for StubEmbedder {
    fn default() -> Self {
        Self::new(STUB_EMBEDDING_DIM)
    }
}

impl StubEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            canned: RwLock::new(HashMap::new()),
            counts: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a fixed vector for `text` (overrides the hash derivation).
    ///
    /// The vector is normalized on the way in so cosine scores stay honest.
    pub fn with_canned(self, text: &str, vector: Vec<f32>) -> Self {
        assert_eq!(
            vector.len(),
            self.dim,
            "canned vector dimension must match the embedder"
        );
        self.canned
            .write()
            .insert(text.to_string(), normalize(vector));
        self
    }

    /// How many times `text` has been embedded.
    pub fn times_embedded(&self, text: &str) -> usize {
        self.counts.read().get(text).copied().unwrap_or(0)
    }

    /// Total number of texts embedded across all calls.
    pub fn total_embedded(&self) -> usize {
        self.counts.read().values().sum()
    }

    fn derive(&self, text: &str) -> Vec<f32> {
        if let Some(canned) = self.canned.read().get(text) {
            return canned.clone();
        }

        let mut reader = blake3::Hasher::new().update(text.as_bytes()).finalize_xof();
        let mut bytes = vec![0u8; self.dim * 4];
        reader.fill(&mut bytes);

        let raw: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|chunk| {
                let bits = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                (bits as f64 / u32::MAX as f64 * 2.0 - 1.0) as f32
            })
            .collect();

        normalize(raw)
    }
}

fn normalize(vector: Vec<f32>) -> Vec<f32> {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        let mut unit = vec![0.0; vector.len()];
        if let Some(first) = unit.first_mut() {
            *first = 1.0;
        }
        return unit;
    }
    vector.into_iter().map(|x| x / norm).collect()
}

impl Embedder for StubEmbedder {
    fn embedding_dim(&self) -> usize {
        self.dim
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        {
            let mut counts = self.counts.write();
            for text in texts {
                *counts.entry(text.clone()).or_insert(0) += 1;
            }
        }

        Ok(texts.iter().map(|text| self.derive(text)).collect())
    }
}

//! In-process vector index for tests and examples.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::vectordb::{
    IndexFilter, Payload, SearchHit, StoredPoint, VectorDbError, VectorIndexClient, VectorPoint,
    WriteConsistency,
};

#[derive(Default)]
pub struct MockVectorIndex {
    collections: RwLock<HashMap<String, MockCollection>>,
    fail_next_upsert: AtomicBool,
}

#[derive(Default, Clone)]
struct MockCollection {
    vector_size: u64,
    points: BTreeMap<u64, MockStoredVector>,
}

#[derive(Clone)]
struct MockStoredVector {
    vector: Vec<f32>,
    payload: Payload,
}

impl MockVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points stored in `collection`, if it exists.
    pub fn point_count(&self, collection: &str) -> Option<usize> {
        self.collections
            .read()
            .get(collection)
            .map(|c| c.points.len())
    }

    /// Payload of a stored point, for assertions.
    pub fn payload_of(&self, collection: &str, id: u64) -> Option<Payload> {
        self.collections
            .read()
            .get(collection)?
            .points
            .get(&id)
            .map(|p| p.payload.clone())
    }

    /// Makes the next `upsert_points` call fail, for transient-error paths.
    pub fn fail_next_upsert(&self) {
        self.fail_next_upsert.store(true, Ordering::SeqCst);
    }
}

impl VectorIndexClient for MockVectorIndex {
    async fn ensure_collection(&self, name: &str, vector_size: u64) -> Result<(), VectorDbError> {
        let mut collections = self.collections.write();

        collections
            .entry(name.to_string())
            .or_insert(MockCollection {
                vector_size,
                points: BTreeMap::new(),
            });

        Ok(())
    }

    async fn upsert_points(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
        _consistency: WriteConsistency,
    ) -> Result<(), VectorDbError> {
        if self.fail_next_upsert.swap(false, Ordering::SeqCst) {
            return Err(VectorDbError::UpsertFailed {
                collection: collection.to_string(),
                message: "injected failure".to_string(),
            });
        }

        let mut collections = self.collections.write();

        let coll =
            collections
                .get_mut(collection)
                .ok_or_else(|| VectorDbError::CollectionNotFound {
                    collection: collection.to_string(),
                })?;

        for point in points {
            if point.vector.len() as u64 != coll.vector_size {
                return Err(VectorDbError::InvalidDimension {
                    expected: coll.vector_size as usize,
                    actual: point.vector.len(),
                });
            }

            coll.points.insert(
                point.id,
                MockStoredVector {
                    vector: point.vector,
                    payload: point.payload,
                },
            );
        }

        Ok(())
    }

    async fn existing_ids(
        &self,
        collection: &str,
        ids: &[u64],
    ) -> Result<HashSet<u64>, VectorDbError> {
        let collections = self.collections.read();

        let coll =
            collections
                .get(collection)
                .ok_or_else(|| VectorDbError::CollectionNotFound {
                    collection: collection.to_string(),
                })?;

        Ok(ids
            .iter()
            .copied()
            .filter(|id| coll.points.contains_key(id))
            .collect())
    }

    async fn search(
        &self,
        collection: &str,
        query: Vec<f32>,
        limit: u64,
        filter: Option<IndexFilter>,
    ) -> Result<Vec<SearchHit>, VectorDbError> {
        let collections = self.collections.read();

        let coll =
            collections
                .get(collection)
                .ok_or_else(|| VectorDbError::CollectionNotFound {
                    collection: collection.to_string(),
                })?;

        // BTreeMap iteration gives id order, and the sort below is stable, so
        // equal scores keep a deterministic tie order.
        let mut results: Vec<SearchHit> = coll
            .points
            .iter()
            .filter(|(_, p)| {
                filter
                    .as_ref()
                    .is_none_or(|f| f.accepts(&p.payload))
            })
            .map(|(&id, p)| SearchHit {
                id,
                score: cosine_similarity(&query, &p.vector),
                payload: p.payload.clone(),
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        results.truncate(limit as usize);
        Ok(results)
    }

    async fn scroll(
        &self,
        collection: &str,
        filter: Option<IndexFilter>,
    ) -> Result<Vec<StoredPoint>, VectorDbError> {
        let collections = self.collections.read();

        let coll =
            collections
                .get(collection)
                .ok_or_else(|| VectorDbError::CollectionNotFound {
                    collection: collection.to_string(),
                })?;

        Ok(coll
            .points
            .iter()
            .filter(|(_, p)| {
                filter
                    .as_ref()
                    .is_none_or(|f| f.accepts(&p.payload))
            })
            .map(|(&id, p)| StoredPoint {
                id,
                payload: p.payload.clone(),
            })
            .collect())
    }

    async fn count(
        &self,
        collection: &str,
        filter: Option<IndexFilter>,
    ) -> Result<u64, VectorDbError> {
        let points = self.scroll(collection, filter).await?;
        Ok(points.len() as u64)
    }

    async fn delete_points(&self, collection: &str, ids: Vec<u64>) -> Result<(), VectorDbError> {
        let mut collections = self.collections.write();

        let coll =
            collections
                .get_mut(collection)
                .ok_or_else(|| VectorDbError::CollectionNotFound {
                    collection: collection.to_string(),
                })?;

        for id in ids {
            coll.points.remove(&id);
        }

        Ok(())
    }

    async fn delete_by_filter(
        &self,
        collection: &str,
        filter: IndexFilter,
    ) -> Result<(), VectorDbError> {
        let mut collections = self.collections.write();

        let coll =
            collections
                .get_mut(collection)
                .ok_or_else(|| VectorDbError::CollectionNotFound {
                    collection: collection.to_string(),
                })?;

        coll.points.retain(|_, p| !filter.accepts(&p.payload));

        Ok(())
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter,
    GetPointsBuilder, PointId, PointStruct, RetrievedPoint, ScrollPointsBuilder,
    SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder, value::Kind,
};

use super::error::VectorDbError;
use super::model::{IndexFilter, Payload, PayloadValue, SearchHit, StoredPoint, VectorPoint};
use crate::vectordb::WriteConsistency;

const SCROLL_PAGE_SIZE: u32 = 256;

/// Minimal async interface used by the retriever and the answer cache.
pub trait VectorIndexClient: Send + Sync {
    /// Ensures a collection exists.
    fn ensure_collection(
        &self,
        name: &str,
        vector_size: u64,
    ) -> impl std::future::Future<Output = Result<(), VectorDbError>> + Send;

    /// Upserts points.
    fn upsert_points(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
        consistency: WriteConsistency,
    ) -> impl std::future::Future<Output = Result<(), VectorDbError>> + Send;

    /// Returns the subset of `ids` already present in the collection.
    fn existing_ids(
        &self,
        collection: &str,
        ids: &[u64],
    ) -> impl std::future::Future<Output = Result<HashSet<u64>, VectorDbError>> + Send;

    /// Searches for similar points, optionally restricted by a payload filter.
    fn search(
        &self,
        collection: &str,
        query: Vec<f32>,
        limit: u64,
        filter: Option<IndexFilter>,
    ) -> impl std::future::Future<Output = Result<Vec<SearchHit>, VectorDbError>> + Send;

    /// Lists all stored points matching a payload filter.
    fn scroll(
        &self,
        collection: &str,
        filter: Option<IndexFilter>,
    ) -> impl std::future::Future<Output = Result<Vec<StoredPoint>, VectorDbError>> + Send;

    /// Counts stored points matching a payload filter.
    fn count(
        &self,
        collection: &str,
        filter: Option<IndexFilter>,
    ) -> impl std::future::Future<Output = Result<u64, VectorDbError>> + Send;

    /// Deletes points by id.
    fn delete_points(
        &self,
        collection: &str,
        ids: Vec<u64>,
    ) -> impl std::future::Future<Output = Result<(), VectorDbError>> + Send;

    /// Deletes all points matching a payload filter.
    fn delete_by_filter(
        &self,
        collection: &str,
        filter: IndexFilter,
    ) -> impl std::future::Future<Output = Result<(), VectorDbError>> + Send;
}

#[derive(Clone)]
/// Direct Qdrant client wrapper.
pub struct QdrantIndex {
    client: Qdrant,
    url: String,
}

impl QdrantIndex {
    /// Creates a client for `url`.
    pub async fn new(url: &str) -> Result<Self, VectorDbError> {
        let client =
            Qdrant::from_url(url)
                .build()
                .map_err(|e| VectorDbError::ConnectionFailed {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// Returns the underlying Qdrant client.
    pub fn client(&self) -> &Qdrant {
        &self.client
    }

    /// Returns the configured URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Performs a basic health check request.
    pub async fn health_check(&self) -> Result<(), VectorDbError> {
        self.client
            .health_check()
            .await
            .map_err(|e| VectorDbError::ConnectionFailed {
                url: self.url.clone(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    /// Creates a collection with cosine distance.
    pub async fn create_collection(
        &self,
        name: &str,
        vector_size: u64,
    ) -> Result<(), VectorDbError> {
        let vectors_config = VectorParamsBuilder::new(vector_size, Distance::Cosine);

        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(vectors_config)
                    .on_disk_payload(true),
            )
            .await
            .map_err(|e| VectorDbError::CreateCollectionFailed {
                collection: name.to_string(),
                message: e.to_string(),
            })?;

        Ok(())
    }
}

fn to_qdrant_payload(payload: Payload) -> HashMap<String, qdrant_client::qdrant::Value> {
    payload
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                PayloadValue::Text(s) => s.into(),
                PayloadValue::Integer(i) => i.into(),
            };
            (key, value)
        })
        .collect()
}

fn from_qdrant_payload(payload: HashMap<String, qdrant_client::qdrant::Value>) -> Payload {
    payload
        .into_iter()
        .filter_map(|(key, value)| {
            let value = match value.kind? {
                Kind::StringValue(s) => PayloadValue::Text(s),
                Kind::IntegerValue(i) => PayloadValue::Integer(i),
                _ => return None,
            };
            Some((key, value))
        })
        .collect()
}

fn to_qdrant_filter(filter: &IndexFilter) -> Filter {
    Filter::must(
        filter
            .must
            .iter()
            .map(|cond| Condition::matches(cond.field.clone(), cond.value.clone())),
    )
}

fn numeric_point_id(id: Option<PointId>) -> Option<u64> {
    match id.and_then(|pid| pid.point_id_options) {
        Some(PointIdOptions::Num(n)) => Some(n),
        _ => None,
    }
}

fn stored_point(point: RetrievedPoint) -> Option<StoredPoint> {
    let id = numeric_point_id(point.id)?;
    Some(StoredPoint {
        id,
        payload: from_qdrant_payload(point.payload),
    })
}

impl VectorIndexClient for QdrantIndex {
    async fn ensure_collection(&self, name: &str, vector_size: u64) -> Result<(), VectorDbError> {
        let exists = self.client.collection_exists(name).await.map_err(|e| {
            VectorDbError::CreateCollectionFailed {
                collection: name.to_string(),
                message: e.to_string(),
            }
        })?;

        if !exists {
            self.create_collection(name, vector_size).await?;
        }

        Ok(())
    }

    async fn upsert_points(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
        consistency: WriteConsistency,
    ) -> Result<(), VectorDbError> {
        if points.is_empty() {
            return Ok(());
        }

        let qdrant_points: Vec<PointStruct> = points
            .into_iter()
            .map(|p| PointStruct::new(p.id, p.vector, to_qdrant_payload(p.payload)))
            .collect();

        self.client
            .upsert_points(
                UpsertPointsBuilder::new(collection, qdrant_points).wait(consistency.into()),
            )
            .await
            .map_err(|e| VectorDbError::UpsertFailed {
                collection: collection.to_string(),
                message: e.to_string(),
            })?;

        Ok(())
    }

    async fn existing_ids(
        &self,
        collection: &str,
        ids: &[u64],
    ) -> Result<HashSet<u64>, VectorDbError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }

        let point_ids: Vec<PointId> = ids.iter().map(|&id| id.into()).collect();

        let response = self
            .client
            .get_points(
                GetPointsBuilder::new(collection, point_ids)
                    .with_payload(false)
                    .with_vectors(false),
            )
            .await
            .map_err(|e| VectorDbError::ReadFailed {
                collection: collection.to_string(),
                message: e.to_string(),
            })?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|point| numeric_point_id(point.id))
            .collect())
    }

    async fn search(
        &self,
        collection: &str,
        query: Vec<f32>,
        limit: u64,
        filter: Option<IndexFilter>,
    ) -> Result<Vec<SearchHit>, VectorDbError> {
        let mut search_builder =
            SearchPointsBuilder::new(collection, query, limit).with_payload(true);

        if let Some(filter) = filter.as_ref().filter(|f| !f.is_empty()) {
            search_builder = search_builder.filter(to_qdrant_filter(filter));
        }

        let search_result = self
            .client
            .search_points(search_builder)
            .await
            .map_err(|e| VectorDbError::SearchFailed {
                collection: collection.to_string(),
                message: e.to_string(),
            })?;

        let results = search_result
            .result
            .into_iter()
            .filter_map(|point| {
                let id = numeric_point_id(point.id)?;
                Some(SearchHit {
                    id,
                    score: point.score,
                    payload: from_qdrant_payload(point.payload),
                })
            })
            .collect();

        Ok(results)
    }

    async fn scroll(
        &self,
        collection: &str,
        filter: Option<IndexFilter>,
    ) -> Result<Vec<StoredPoint>, VectorDbError> {
        let mut points = Vec::new();
        let mut offset: Option<PointId> = None;

        loop {
            let mut builder = ScrollPointsBuilder::new(collection)
                .limit(SCROLL_PAGE_SIZE)
                .with_payload(true);

            if let Some(filter) = filter.as_ref().filter(|f| !f.is_empty()) {
                builder = builder.filter(to_qdrant_filter(filter));
            }
            if let Some(offset) = offset.take() {
                builder = builder.offset(offset);
            }

            let response =
                self.client
                    .scroll(builder)
                    .await
                    .map_err(|e| VectorDbError::ReadFailed {
                        collection: collection.to_string(),
                        message: e.to_string(),
                    })?;

            points.extend(response.result.into_iter().filter_map(stored_point));

            match response.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(points)
    }

    async fn count(
        &self,
        collection: &str,
        filter: Option<IndexFilter>,
    ) -> Result<u64, VectorDbError> {
        let mut builder = CountPointsBuilder::new(collection).exact(true);

        if let Some(filter) = filter.as_ref().filter(|f| !f.is_empty()) {
            builder = builder.filter(to_qdrant_filter(filter));
        }

        let response =
            self.client
                .count(builder)
                .await
                .map_err(|e| VectorDbError::ReadFailed {
                    collection: collection.to_string(),
                    message: e.to_string(),
                })?;

        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }

    async fn delete_points(&self, collection: &str, ids: Vec<u64>) -> Result<(), VectorDbError> {
        if ids.is_empty() {
            return Ok(());
        }

        use qdrant_client::qdrant::PointsIdsList;

        let points_selector = PointsIdsList {
            ids: ids.into_iter().map(|id| id.into()).collect(),
        };

        self.client
            .delete_points(
                DeletePointsBuilder::new(collection)
                    .points(points_selector)
                    .wait(true),
            )
            .await
            .map_err(|e| VectorDbError::DeleteFailed {
                collection: collection.to_string(),
                message: e.to_string(),
            })?;

        Ok(())
    }

    async fn delete_by_filter(
        &self,
        collection: &str,
        filter: IndexFilter,
    ) -> Result<(), VectorDbError> {
        self.client
            .delete_points(
                DeletePointsBuilder::new(collection)
                    .points(to_qdrant_filter(&filter))
                    .wait(true),
            )
            .await
            .map_err(|e| VectorDbError::DeleteFailed {
                collection: collection.to_string(),
                message: e.to_string(),
            })?;

        Ok(())
    }
}

impl<T: VectorIndexClient> VectorIndexClient for Arc<T> {
    async fn ensure_collection(&self, name: &str, vector_size: u64) -> Result<(), VectorDbError> {
        (**self).ensure_collection(name, vector_size).await
    }

    async fn upsert_points(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
        consistency: WriteConsistency,
    ) -> Result<(), VectorDbError> {
        (**self).upsert_points(collection, points, consistency).await
    }

    async fn existing_ids(
        &self,
        collection: &str,
        ids: &[u64],
    ) -> Result<HashSet<u64>, VectorDbError> {
        (**self).existing_ids(collection, ids).await
    }

    async fn search(
        &self,
        collection: &str,
        query: Vec<f32>,
        limit: u64,
        filter: Option<IndexFilter>,
    ) -> Result<Vec<SearchHit>, VectorDbError> {
        (**self).search(collection, query, limit, filter).await
    }

    async fn scroll(
        &self,
        collection: &str,
        filter: Option<IndexFilter>,
    ) -> Result<Vec<StoredPoint>, VectorDbError> {
        (**self).scroll(collection, filter).await
    }

    async fn count(
        &self,
        collection: &str,
        filter: Option<IndexFilter>,
    ) -> Result<u64, VectorDbError> {
        (**self).count(collection, filter).await
    }

    async fn delete_points(&self, collection: &str, ids: Vec<u64>) -> Result<(), VectorDbError> {
        (**self).delete_points(collection, ids).await
    }

    async fn delete_by_filter(
        &self,
        collection: &str,
        filter: IndexFilter,
    ) -> Result<(), VectorDbError> {
        (**self).delete_by_filter(collection, filter).await
    }
}

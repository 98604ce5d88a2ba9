use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::embedding::{Embedder, embed_single};
use crate::hashing::cache_point_id;
use crate::vectordb::{
    IndexFilter, Payload, PayloadValue, SearchHit, VectorIndexClient, VectorPoint,
    WriteConsistency,
};

use super::config::CacheConfig;
use super::error::{CacheError, CacheResult};
use super::types::{CacheLookup, CacheScope, CacheStats, CachedAnswer};

const PAYLOAD_SCOPE: &str = "scope";
const PAYLOAD_SESSION_ID: &str = "session_id";
const PAYLOAD_RESPONSE: &str = "response";
const PAYLOAD_QUERY: &str = "query";
const PAYLOAD_CACHED_AT: &str = "cached_at";
const PAYLOAD_META_PREFIX: &str = "meta_";

/// Semantic answer cache over its own vector collection, partitioned into
/// per-session and global pools via payload filters.
pub struct SemanticResponseCache<C: VectorIndexClient, E: Embedder> {
    index: C,
    embedder: Arc<E>,
    config: CacheConfig,
    // Serializes cache mutations; independent of the retrieval index lock.
    write_lock: Mutex<()>,
}

impl<C: VectorIndexClient, E: Embedder> std::fmt::Debug for SemanticResponseCache<C, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticResponseCache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<C: VectorIndexClient, E: Embedder> SemanticResponseCache<C, E> {
    pub fn new(index: C, embedder: Arc<E>, config: CacheConfig) -> CacheResult<Self> {
        config.validate()?;

        Ok(Self {
            index,
            embedder,
            config,
            write_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Ensures the answers collection exists.
    pub async fn ensure_collection(&self) -> CacheResult<()> {
        self.index
            .ensure_collection(&self.config.collection_name, self.config.vector_size)
            .await?;
        Ok(())
    }

    /// Looks up a semantically equivalent previous question.
    ///
    /// Session partition first (when a session id is given), then global.
    /// Expired session entries are deleted on the way (lazy eviction).
    /// Internal failures degrade to a miss: the cache must never block the
    /// caller from doing full retrieval.
    #[instrument(skip(self, query), fields(query_len = query.len(), session = session_id.is_some()))]
    pub async fn get(&self, query: &str, session_id: Option<&str>) -> CacheLookup {
        match self.lookup(query, session_id).await {
            Ok(lookup) => lookup,
            Err(error) => {
                warn!(%error, "Cache lookup failed; treating as miss");
                CacheLookup::Miss
            }
        }
    }

    async fn lookup(&self, query: &str, session_id: Option<&str>) -> CacheResult<CacheLookup> {
        let vector = self
            .with_timeout("embedding", embed_single(self.embedder.as_ref(), query))
            .await?;

        if let Some(session_id) = session_id {
            let filter = IndexFilter::new()
                .matches(PAYLOAD_SCOPE, CacheScope::Session.as_str())
                .matches(PAYLOAD_SESSION_ID, session_id);

            if let Some(hit) = self.nearest(vector.clone(), filter).await? {
                if hit.score >= self.config.similarity_threshold {
                    match decode_answer(&hit, hit.score) {
                        Some(answer) if self.is_expired(answer.cached_at) => {
                            debug!(point_id = hit.id, "Session entry expired; evicting");
                            let _guard = self.write_lock.lock().await;
                            self.index
                                .delete_points(&self.config.collection_name, vec![hit.id])
                                .await?;
                        }
                        Some(answer) => {
                            info!(similarity = hit.score, "Session cache hit");
                            return Ok(CacheLookup::Hit(answer));
                        }
                        None => {
                            warn!(point_id = hit.id, "Malformed session cache entry; skipping");
                        }
                    }
                }
            }
        }

        let filter = IndexFilter::new().matches(PAYLOAD_SCOPE, CacheScope::Global.as_str());

        if let Some(hit) = self.nearest(vector, filter).await?
            && hit.score >= self.config.similarity_threshold
        {
            match decode_answer(&hit, hit.score) {
                Some(answer) => {
                    info!(similarity = hit.score, "Global cache hit");
                    return Ok(CacheLookup::Hit(answer));
                }
                None => {
                    warn!(point_id = hit.id, "Malformed global cache entry; skipping");
                }
            }
        }

        debug!("Cache miss");
        Ok(CacheLookup::Miss)
    }

    /// Stores an answer under a deterministic id, so repeating the exact
    /// (scope, session, query) triple overwrites instead of duplicating.
    #[instrument(skip(self, query, response, metadata), fields(scope = scope.as_str(), query_len = query.len()))]
    pub async fn set(
        &self,
        query: &str,
        response: &str,
        session_id: Option<&str>,
        scope: CacheScope,
        metadata: Option<HashMap<String, String>>,
    ) -> CacheResult<u64> {
        let session_id = match (scope, session_id) {
            (CacheScope::Session, None) => return Err(CacheError::MissingSessionId),
            (CacheScope::Session, Some(id)) => Some(id),
            // a session id on a global write is irrelevant to identity
            (CacheScope::Global, _) => None,
        };

        self.write_entry(query, response, session_id, scope, metadata, Utc::now())
            .await
    }

    /// Deletes every entry belonging to `session_id`.
    #[instrument(skip(self))]
    pub async fn clear_session(&self, session_id: &str) -> CacheResult<()> {
        let filter = IndexFilter::new()
            .matches(PAYLOAD_SCOPE, CacheScope::Session.as_str())
            .matches(PAYLOAD_SESSION_ID, session_id);

        let _guard = self.write_lock.lock().await;
        self.index
            .delete_by_filter(&self.config.collection_name, filter)
            .await?;

        info!("Session cache cleared");
        Ok(())
    }

    /// Scans the session partition and deletes TTL-expired entries,
    /// returning how many were removed. Reads only evict lazily; this is the
    /// batch counterpart for periodic maintenance.
    #[instrument(skip(self))]
    pub async fn cleanup_expired_sessions(&self) -> CacheResult<usize> {
        let filter = IndexFilter::new().matches(PAYLOAD_SCOPE, CacheScope::Session.as_str());

        let points = self
            .with_timeout(
                "cache scroll",
                self.index.scroll(&self.config.collection_name, Some(filter)),
            )
            .await?;

        let expired: Vec<u64> = points
            .iter()
            .filter(|point| {
                cached_at_of(&point.payload)
                    .map(|at| self.is_expired(at))
                    // entries without a readable timestamp are garbage
                    .unwrap_or(true)
            })
            .map(|point| point.id)
            .collect();

        let removed = expired.len();
        if removed > 0 {
            let _guard = self.write_lock.lock().await;
            self.index
                .delete_points(&self.config.collection_name, expired)
                .await?;
        }

        info!(scanned = points.len(), removed, "Expired session entries cleaned up");
        Ok(removed)
    }

    /// Entry counts by scope.
    pub async fn stats(&self) -> CacheResult<CacheStats> {
        let session_filter =
            IndexFilter::new().matches(PAYLOAD_SCOPE, CacheScope::Session.as_str());
        let global_filter = IndexFilter::new().matches(PAYLOAD_SCOPE, CacheScope::Global.as_str());

        let session_entries = self
            .index
            .count(&self.config.collection_name, Some(session_filter))
            .await?;
        let global_entries = self
            .index
            .count(&self.config.collection_name, Some(global_filter))
            .await?;

        Ok(CacheStats {
            session_entries,
            global_entries,
        })
    }

    // Split out so tests can backdate entries.
    pub(super) async fn write_entry(
        &self,
        query: &str,
        response: &str,
        session_id: Option<&str>,
        scope: CacheScope,
        metadata: Option<HashMap<String, String>>,
        cached_at: DateTime<Utc>,
    ) -> CacheResult<u64> {
        let point_id = cache_point_id(scope.as_str(), session_id, query);

        let vector = self
            .with_timeout("embedding", embed_single(self.embedder.as_ref(), query))
            .await?;

        let mut payload = Payload::new();
        payload.insert(
            PAYLOAD_SCOPE.to_string(),
            PayloadValue::Text(scope.as_str().to_string()),
        );
        if let Some(session_id) = session_id {
            payload.insert(
                PAYLOAD_SESSION_ID.to_string(),
                PayloadValue::Text(session_id.to_string()),
            );
        }
        payload.insert(
            PAYLOAD_RESPONSE.to_string(),
            PayloadValue::Text(response.to_string()),
        );
        payload.insert(
            PAYLOAD_QUERY.to_string(),
            PayloadValue::Text(truncate_chars(query, self.config.query_preview_len)),
        );
        payload.insert(
            PAYLOAD_CACHED_AT.to_string(),
            PayloadValue::Integer(cached_at.timestamp()),
        );
        for (key, value) in metadata.unwrap_or_default() {
            payload.insert(
                format!("{PAYLOAD_META_PREFIX}{key}"),
                PayloadValue::Text(value),
            );
        }

        let point = VectorPoint::new(point_id, vector, payload);

        {
            let _guard = self.write_lock.lock().await;
            self.with_timeout(
                "cache upsert",
                self.index.upsert_points(
                    &self.config.collection_name,
                    vec![point],
                    WriteConsistency::Strong,
                ),
            )
            .await?;
        }

        debug!(point_id, "Answer cached");
        Ok(point_id)
    }

    async fn nearest(
        &self,
        vector: Vec<f32>,
        filter: IndexFilter,
    ) -> CacheResult<Option<SearchHit>> {
        let hits = self
            .with_timeout(
                "cache search",
                self.index
                    .search(&self.config.collection_name, vector, 1, Some(filter)),
            )
            .await?;

        Ok(hits.into_iter().next())
    }

    fn is_expired(&self, cached_at: DateTime<Utc>) -> bool {
        let age = Utc::now().signed_duration_since(cached_at);
        age.num_seconds() > self.config.session_ttl.as_secs() as i64
    }

    async fn with_timeout<T, E2, F>(&self, operation: &'static str, fut: F) -> CacheResult<T>
    where
        E2: Into<CacheError>,
        F: std::future::Future<Output = Result<T, E2>>,
    {
        match tokio::time::timeout(self.config.op_timeout, fut).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(CacheError::Timeout {
                operation,
                timeout: self.config.op_timeout,
            }),
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn cached_at_of(payload: &Payload) -> Option<DateTime<Utc>> {
    let seconds = payload.get(PAYLOAD_CACHED_AT)?.as_integer()?;
    Utc.timestamp_opt(seconds, 0).single()
}

fn decode_answer(hit: &SearchHit, similarity: f32) -> Option<CachedAnswer> {
    let payload = &hit.payload;

    let scope = CacheScope::parse(payload.get(PAYLOAD_SCOPE)?.as_text()?)?;
    let response = payload.get(PAYLOAD_RESPONSE)?.as_text()?.to_string();
    let original_query = payload
        .get(PAYLOAD_QUERY)
        .and_then(PayloadValue::as_text)
        .unwrap_or_default()
        .to_string();
    let cached_at = cached_at_of(payload)?;
    let session_id = payload
        .get(PAYLOAD_SESSION_ID)
        .and_then(PayloadValue::as_text)
        .map(str::to_string);

    let metadata: HashMap<String, String> = payload
        .iter()
        .filter_map(|(key, value)| {
            let stripped = key.strip_prefix(PAYLOAD_META_PREFIX)?;
            Some((stripped.to_string(), value.as_text()?.to_string()))
        })
        .collect();

    Some(CachedAnswer {
        response,
        original_query,
        scope,
        session_id,
        cached_at,
        similarity,
        metadata,
    })
}

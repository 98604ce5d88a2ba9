//! Pipeline context: one object wiring the Block Store, the Indexed
//! Retriever, and the Semantic Response Cache.
//!
//! Constructed once at process start and passed by handle into every
//! operation; there is no global state and no implicit reinitialization.

pub mod error;

pub use error::{PipelineError, PipelineResult};

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::block::{BlockEnrichment, ConversationBlock};
use crate::cache::{
    CacheConfig, CacheLookup, CacheScope, CacheStats, SemanticResponseCache,
};
use crate::config::Config;
use crate::embedding::Embedder;
use crate::retriever::{
    IndexOutcome, IndexedRetriever, QueryOptions, RetrievedBlock, RetrieverConfig, RetrieverError,
};
use crate::store::BlockStore;
use crate::vectordb::VectorIndexClient;

/// Everything the query-handling layer consumes, behind one handle.
///
/// The two vector collections (blocks and answers) live on the same client
/// type but are mutated independently; the shared embedder is cloned by
/// handle into both components.
pub struct AnalyticsPipeline<C, E>
where
    C: VectorIndexClient + Clone,
    E: Embedder,
{
    store: Arc<BlockStore>,
    retriever: IndexedRetriever<C, E>,
    cache: SemanticResponseCache<C, E>,
}

impl<C, E> AnalyticsPipeline<C, E>
where
    C: VectorIndexClient + Clone,
    E: Embedder,
{
    /// Wires the pipeline from a process [`Config`].
    pub fn new(client: C, embedder: Arc<E>, config: &Config) -> PipelineResult<Self> {
        if embedder.embedding_dim() != config.embedding_dim {
            return Err(PipelineError::Retriever(RetrieverError::ConfigError {
                reason: format!(
                    "embedder produces {}-dimensional vectors but {} are configured",
                    embedder.embedding_dim(),
                    config.embedding_dim
                ),
            }));
        }

        let store = Arc::new(BlockStore::open(config.store_path.clone()));

        let retriever_config = RetrieverConfig::default()
            .collection_name(&config.blocks_collection)
            .vector_size(config.embedding_dim as u64)
            .op_timeout(config.op_timeout);

        let cache_config = CacheConfig::default()
            .collection_name(&config.answers_collection)
            .vector_size(config.embedding_dim as u64)
            .similarity_threshold(config.similarity_threshold)
            .session_ttl(config.session_ttl)
            .op_timeout(config.op_timeout);

        let retriever = IndexedRetriever::new(
            Arc::clone(&store),
            client.clone(),
            Arc::clone(&embedder),
            retriever_config,
        )?;
        let cache = SemanticResponseCache::new(client, embedder, cache_config)?;

        Ok(Self {
            store,
            retriever,
            cache,
        })
    }

    /// Hydrates the store and ensures both collections exist.
    ///
    /// An unreadable or corrupt store snapshot is logged and answered by
    /// starting empty; the durable copy is rewritten on the next successful
    /// index batch.
    pub async fn init(&self) -> PipelineResult<()> {
        let store = Arc::clone(&self.store);
        let loaded = tokio::task::spawn_blocking(move || store.load()).await;

        match loaded {
            Ok(Ok(count)) => info!(blocks = count, "Block store hydrated"),
            Ok(Err(err)) if err.is_recoverable_load() => {
                warn!(error = %err, "Block store unreadable; starting empty");
            }
            Ok(Err(err)) => return Err(PipelineError::Retriever(err.into())),
            Err(join_err) => {
                warn!(error = %join_err, "Block store load task failed; starting empty");
            }
        }

        self.retriever.ensure_collection().await?;
        self.cache.ensure_collection().await?;
        Ok(())
    }

    pub fn store(&self) -> &Arc<BlockStore> {
        &self.store
    }

    pub fn retriever(&self) -> &IndexedRetriever<C, E> {
        &self.retriever
    }

    pub fn cache(&self) -> &SemanticResponseCache<C, E> {
        &self.cache
    }

    /// Applies enrichment results, then indexes the batch (idempotent per
    /// id).
    pub async fn index_blocks(
        &self,
        mut blocks: Vec<ConversationBlock>,
        enrichments: &[BlockEnrichment],
    ) -> PipelineResult<IndexOutcome> {
        if !enrichments.is_empty() {
            let by_id: HashMap<&str, &BlockEnrichment> = enrichments
                .iter()
                .map(|e| (e.block_id.as_str(), e))
                .collect();

            for block in &mut blocks {
                if let Some(enrichment) = by_id.get(block.block_id.as_str()) {
                    block.apply_enrichment(enrichment);
                }
            }
        }

        Ok(self.retriever.index_blocks(blocks).await?)
    }

    /// Ranked retrieval; an empty list means no eligible candidates, not a
    /// failure.
    pub async fn query(
        &self,
        text: &str,
        top_k: usize,
        options: &QueryOptions,
    ) -> PipelineResult<Vec<RetrievedBlock>> {
        Ok(self.retriever.query(text, top_k, options).await?)
    }

    /// Semantic cache lookup; degrades internally to a miss on failure.
    pub async fn cache_get(&self, query: &str, session_id: Option<&str>) -> CacheLookup {
        self.cache.get(query, session_id).await
    }

    /// Writes an answer back to the cache.
    pub async fn cache_set(
        &self,
        query: &str,
        response: &str,
        session_id: Option<&str>,
        scope: CacheScope,
        metadata: Option<HashMap<String, String>>,
    ) -> PipelineResult<u64> {
        Ok(self
            .cache
            .set(query, response, session_id, scope, metadata)
            .await?)
    }

    /// Deletes all of a session's cache entries.
    pub async fn clear_session(&self, session_id: &str) -> PipelineResult<()> {
        Ok(self.cache.clear_session(session_id).await?)
    }

    /// Batch-deletes TTL-expired session entries.
    pub async fn cleanup_expired_sessions(&self) -> PipelineResult<usize> {
        Ok(self.cache.cleanup_expired_sessions().await?)
    }

    /// Cache and store counters for the orchestration layer.
    pub async fn stats(&self) -> PipelineResult<PipelineStats> {
        let cache = self.cache.stats().await?;
        Ok(PipelineStats {
            cache,
            resident_blocks: self.store.len(),
        })
    }
}

/// Counters exposed at the pipeline boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub cache: CacheStats,
    pub resident_blocks: usize,
}

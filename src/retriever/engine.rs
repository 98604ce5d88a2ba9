use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::block::{BlockMetadata, ConversationBlock};
use crate::embedding::{Embedder, embed_single};
use crate::hashing::block_point_id;
use crate::store::BlockStore;
use crate::vectordb::{VectorIndexClient, VectorPoint, WriteConsistency};

use super::config::RetrieverConfig;
use super::error::{RetrieverError, RetrieverResult};
use super::ranking;
use super::types::{IndexOutcome, QueryOptions, RetrievedBlock};

/// Owns the retrieval collection: deduplicated incremental indexing of
/// conversation blocks and ranked, filter-aware nearest-neighbor queries.
pub struct IndexedRetriever<C: VectorIndexClient, E: Embedder> {
    store: Arc<BlockStore>,
    index: C,
    embedder: Arc<E>,
    config: RetrieverConfig,
    // Serializes index mutations. Held for existence checks and the upsert,
    // never across the embedding call.
    write_lock: Mutex<()>,
}

impl<C: VectorIndexClient, E: Embedder> std::fmt::Debug for IndexedRetriever<C, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexedRetriever")
            .field("config", &self.config)
            .field("resident_blocks", &self.store.len())
            .finish_non_exhaustive()
    }
}

impl<C: VectorIndexClient, E: Embedder> IndexedRetriever<C, E> {
    pub fn new(
        store: Arc<BlockStore>,
        index: C,
        embedder: Arc<E>,
        config: RetrieverConfig,
    ) -> RetrieverResult<Self> {
        config.validate()?;

        Ok(Self {
            store,
            index,
            embedder,
            config,
            write_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<BlockStore> {
        &self.store
    }

    /// Ensures the retrieval collection exists.
    pub async fn ensure_collection(&self) -> RetrieverResult<()> {
        self.index
            .ensure_collection(&self.config.collection_name, self.config.vector_size)
            .await?;
        Ok(())
    }

    /// Indexes a batch of candidate blocks.
    ///
    /// Candidates land in the Block Store map before anything else, so
    /// queries see them even if embedding later fails. Ids already present in
    /// the index are skipped: indexing is append-only and idempotent, each id
    /// pays the embedding cost at most once. The store is persisted only
    /// after a successful index write; on failure the map stays
    /// merged-but-unindexed so a retry reuses the same input.
    #[instrument(skip(self, candidates), fields(candidates = candidates.len()))]
    pub async fn index_blocks(
        &self,
        candidates: Vec<ConversationBlock>,
    ) -> RetrieverResult<IndexOutcome> {
        if candidates.is_empty() {
            return Ok(IndexOutcome::default());
        }

        let merged = self.store.upsert(&candidates);

        let ids: Vec<u64> = candidates
            .iter()
            .map(|block| block_point_id(&block.block_id))
            .collect();

        let existing = {
            let _guard = self.write_lock.lock().await;
            self.with_timeout(
                "index existence check",
                self.index.existing_ids(&self.config.collection_name, &ids),
            )
            .await?
        };

        let new_blocks: Vec<(u64, &ConversationBlock)> = ids
            .iter()
            .copied()
            .zip(candidates.iter())
            .filter(|(id, _)| !existing.contains(id))
            .collect();

        let skipped = candidates.len() - new_blocks.len();

        if new_blocks.is_empty() {
            debug!(skipped, "All candidates already indexed");
            self.persist_store().await?;
            return Ok(IndexOutcome {
                merged,
                indexed: 0,
                skipped,
            });
        }

        let snapshots: Vec<BlockMetadata> = new_blocks
            .iter()
            .map(|(_, block)| BlockMetadata::snapshot(block))
            .collect();

        let texts: Vec<String> = snapshots
            .iter()
            .zip(new_blocks.iter())
            .map(|(snapshot, (_, block))| snapshot.embedding_input(&block.flattened_text))
            .collect();

        debug!(new = new_blocks.len(), "Embedding new candidates");
        let vectors = self
            .with_timeout("embedding", self.embedder.embed_batch(&texts))
            .await?;

        if vectors.len() != texts.len() {
            return Err(RetrieverError::EmbeddingFailed {
                reason: format!(
                    "embedder returned {} vectors for {} texts",
                    vectors.len(),
                    texts.len()
                ),
            });
        }

        let points: Vec<VectorPoint> = new_blocks
            .iter()
            .zip(snapshots)
            .zip(vectors)
            .map(|((&(id, _), snapshot), vector)| {
                VectorPoint::new(id, vector, snapshot.to_payload())
            })
            .collect();

        let indexed = {
            let _guard = self.write_lock.lock().await;

            // A concurrent writer may have indexed some of these ids while we
            // were embedding; re-check so nothing is overwritten.
            let now_existing = self
                .with_timeout(
                    "index existence check",
                    self.index.existing_ids(&self.config.collection_name, &ids),
                )
                .await?;

            let fresh: Vec<VectorPoint> = points
                .into_iter()
                .filter(|point| !now_existing.contains(&point.id))
                .collect();
            let fresh_count = fresh.len();

            self.with_timeout(
                "index upsert",
                self.index.upsert_points(
                    &self.config.collection_name,
                    fresh,
                    WriteConsistency::Strong,
                ),
            )
            .await?;

            fresh_count
        };

        self.persist_store().await?;

        info!(merged, indexed, skipped, "Index batch complete");

        Ok(IndexOutcome {
            merged,
            indexed,
            skipped,
        })
    }

    /// Answers a ranked, filter-aware nearest-neighbor query.
    ///
    /// Pipeline: embed, over-fetch, hydrate (orphans dropped), hard time
    /// filter, soft preference partition, diversity pruning with a
    /// score-order fallback.
    #[instrument(skip(self, text, options), fields(query_len = text.len()))]
    pub async fn query(
        &self,
        text: &str,
        top_k: usize,
        options: &QueryOptions,
    ) -> RetrieverResult<Vec<RetrievedBlock>> {
        if let Some(window) = &options.window {
            window.validate()?;
        }

        if top_k == 0 {
            return Ok(Vec::new());
        }

        let vector = self
            .with_timeout("embedding", embed_single(self.embedder.as_ref(), text))
            .await?;

        let fetch_limit = self.config.overfetch_limit(top_k);
        let hits = self
            .with_timeout(
                "index search",
                self.index.search(
                    &self.config.collection_name,
                    vector,
                    fetch_limit as u64,
                    None,
                ),
            )
            .await?;

        let fetched = hits.len();

        let mut candidates = Vec::with_capacity(hits.len());
        for hit in hits {
            let Some(metadata) = BlockMetadata::from_payload(&hit.payload) else {
                debug!(point_id = hit.id, "Foreign point payload, skipping");
                continue;
            };

            match self.store.get(&metadata.block_id) {
                Some(block) => candidates.push(RetrievedBlock {
                    block,
                    score: hit.score,
                    metadata,
                }),
                None => {
                    // Index entry without a resident block (restart race);
                    // treated as absent, never as an error.
                    debug!(block_id = %metadata.block_id, "Orphan index id, dropping");
                }
            }
        }

        let hydrated = candidates.len();

        if let Some(window) = &options.window {
            candidates = ranking::filter_by_window(candidates, window);
        }

        if !options.filters.is_empty() {
            candidates = ranking::partition_by_preference(candidates, &options.filters);
        }

        let eligible = candidates.len();

        let (results, fallback_used) =
            ranking::prune_near_duplicates(candidates, top_k, self.config.max_token_overlap);

        if fallback_used {
            warn!(
                top_k,
                eligible, "Diversity pruning rejected every candidate; returning by score order"
            );
        }

        info!(
            fetched,
            hydrated,
            eligible,
            returned = results.len(),
            fallback_used,
            "Query complete"
        );

        Ok(results)
    }

    async fn persist_store(&self) -> RetrieverResult<()> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.save())
            .await
            .map_err(|e| RetrieverError::Store(crate::store::StoreError::PersistFailed {
                path: self.store.path().to_path_buf(),
                message: format!("persistence task failed: {e}"),
            }))??;
        Ok(())
    }

    async fn with_timeout<T, E2, F>(&self, operation: &'static str, fut: F) -> RetrieverResult<T>
    where
        E2: Into<RetrieverError>,
        F: std::future::Future<Output = Result<T, E2>>,
    {
        match tokio::time::timeout(self.config.op_timeout, fut).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(RetrieverError::Timeout {
                operation,
                timeout: self.config.op_timeout,
            }),
        }
    }
}

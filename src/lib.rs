//! threadlens: retrieval and caching core for a conversational analytics
//! assistant.
//!
//! Three components, bottom-up:
//!
//! - [`BlockStore`] - durable map from block id to enriched conversation
//!   block; source of truth for content.
//! - [`IndexedRetriever`] - owns the blocks vector collection; deduplicated
//!   incremental indexing plus ranked, time/filter-aware, diversity-pruned
//!   nearest-neighbor queries.
//! - [`SemanticResponseCache`] - an independent vector collection mapping
//!   previously-asked questions to previously-generated answers, partitioned
//!   per-session and globally, with TTL on session entries.
//!
//! [`AnalyticsPipeline`] wires the three behind one handle for the
//! query-handling layer. Embedding computation and answer generation are
//! injected capabilities and live outside this crate; [`Embedder`] is the
//! seam for the former.
//!
//! # Public API Surface
//!
//! ## Core Types (Stable)
//! - [`Config`], [`ConfigError`] - Process configuration
//! - [`ConversationBlock`], [`BlockOrigin`], [`BlockMetadata`] - Data model
//! - [`AnalyticsPipeline`], [`PipelineError`] - Top-level wiring
//!
//! ## Retrieval
//! - [`IndexedRetriever`], [`RetrieverConfig`] - Indexing + queries
//! - [`QueryOptions`], [`TimeWindow`], [`SoftFilters`] - Query knobs
//! - [`RetrievedBlock`], [`IndexOutcome`] - Results
//!
//! ## Caching
//! - [`SemanticResponseCache`], [`CacheConfig`] - Answer cache
//! - [`CacheLookup`], [`CachedAnswer`], [`CacheScope`], [`CacheStats`]
//!
//! ## Vector Database
//! - [`QdrantIndex`] - Direct Qdrant access
//! - [`VectorIndexClient`] - The index seam (implement to swap backends)
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod block;
pub mod cache;
pub mod config;
pub mod constants;
pub mod embedding;
pub mod hashing;
pub mod pipeline;
pub mod retriever;
pub mod store;
pub mod vectordb;

pub use block::{
    BlockEnrichment, BlockMetadata, BlockOrigin, ConversationBlock, ConversationMessage,
    parse_timestamp,
};

pub use cache::{
    CacheConfig, CacheError, CacheLookup, CacheResult, CacheScope, CacheStats, CachedAnswer,
    SemanticResponseCache,
};

pub use config::{Config, ConfigError};

#[cfg(any(test, feature = "mock"))]
pub use embedding::StubEmbedder;
pub use embedding::{Embedder, EmbeddingError};

pub use hashing::{block_point_id, cache_point_id, hash_to_u64};

pub use pipeline::{AnalyticsPipeline, PipelineError, PipelineResult, PipelineStats};

pub use retriever::{
    IndexOutcome, IndexedRetriever, QueryOptions, RetrievedBlock, RetrieverConfig, RetrieverError,
    RetrieverResult, SoftFilters, TimeWindow,
};

pub use store::{BlockStore, StoreError, StoreResult};

#[cfg(any(test, feature = "mock"))]
pub use vectordb::MockVectorIndex;
pub use vectordb::{
    IndexFilter, Payload, PayloadValue, QdrantIndex, SearchHit, StoredPoint, VectorDbError,
    VectorIndexClient, VectorPoint, WriteConsistency,
};

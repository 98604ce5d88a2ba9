//! Cross-cutting, shared constants.
//!
//! Prefer deriving secondary constants from primary ones to avoid drift.
//! Runtime-configurable equivalents live in [`crate::config::Config`] and the
//! per-component configs; the constants here are their defaults.

/// Default embedding dimensionality (must match the injected embedder).
pub const DEFAULT_EMBEDDING_DIM: usize = 1536;

/// Default vector size as the u64 the vector index expects.
pub const DEFAULT_VECTOR_SIZE: u64 = DEFAULT_EMBEDDING_DIM as u64;

/// Collection holding indexed conversation blocks.
pub const BLOCKS_COLLECTION_NAME: &str = "threadlens_blocks";

/// Collection holding cached answers.
pub const ANSWERS_COLLECTION_NAME: &str = "threadlens_answers";

/// Minimum cosine similarity for a cached answer to count as a hit.
///
/// Intentionally high: a false hit returns a stale answer with no correction
/// path, so precision wins over recall.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.96;

/// Lifetime of a session-scoped cache entry, in seconds (12 hours).
pub const DEFAULT_SESSION_TTL_SECS: u64 = 12 * 60 * 60;

/// Over-fetch factor applied to `top_k` before filtering stages.
pub const OVERFETCH_MULTIPLIER: usize = 5;

/// Candidate cap for ordinary queries.
pub const CANDIDATE_CAP: usize = 100;

/// Candidate cap for deliberately broad queries.
pub const BROAD_CANDIDATE_CAP: usize = 1000;

/// `top_k` at or above which a query is treated as broad/statistical.
pub const BROAD_TOP_K_THRESHOLD: usize = 300;

/// Token-overlap ratio above which a candidate is pruned as a near-duplicate.
pub const MAX_TOKEN_OVERLAP_RATIO: f32 = 0.80;

/// Characters of the original query kept on a cache entry.
pub const DEFAULT_QUERY_PREVIEW_LEN: usize = 256;

/// Default timeout for embedding and vector-index calls, in seconds.
pub const DEFAULT_OP_TIMEOUT_SECS: u64 = 30;

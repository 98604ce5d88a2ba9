use std::time::Duration;

use crate::constants::{
    ANSWERS_COLLECTION_NAME, DEFAULT_OP_TIMEOUT_SECS, DEFAULT_QUERY_PREVIEW_LEN,
    DEFAULT_SESSION_TTL_SECS, DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_VECTOR_SIZE,
};

use super::error::{CacheError, CacheResult};

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub collection_name: String,
    pub vector_size: u64,
    /// Minimum cosine similarity for a hit. High on purpose: a false hit
    /// returns a stale answer with no correction path.
    pub similarity_threshold: f32,
    /// Lifetime of session-scoped entries. Global entries never expire.
    pub session_ttl: Duration,
    /// Characters of the original query kept on an entry.
    pub query_preview_len: usize,
    /// Timeout for embedding and index calls.
    pub op_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            collection_name: ANSWERS_COLLECTION_NAME.to_string(),
            vector_size: DEFAULT_VECTOR_SIZE,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            query_preview_len: DEFAULT_QUERY_PREVIEW_LEN,
            op_timeout: Duration::from_secs(DEFAULT_OP_TIMEOUT_SECS),
        }
    }
}

impl CacheConfig {
    pub fn collection_name(mut self, name: &str) -> Self {
        self.collection_name = name.to_string();
        self
    }

    pub fn vector_size(mut self, size: u64) -> Self {
        self.vector_size = size;
        self
    }

    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    pub fn validate(&self) -> CacheResult<()> {
        if self.collection_name.is_empty() {
            return Err(CacheError::ConfigError {
                reason: "collection_name must not be empty".to_string(),
            });
        }
        if self.vector_size == 0 {
            return Err(CacheError::ConfigError {
                reason: "vector_size must be > 0".to_string(),
            });
        }
        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(CacheError::ConfigError {
                reason: format!(
                    "similarity_threshold ({}) must be within (0, 1]",
                    self.similarity_threshold
                ),
            });
        }
        if self.session_ttl.is_zero() {
            return Err(CacheError::ConfigError {
                reason: "session_ttl must be > 0".to_string(),
            });
        }
        if self.query_preview_len == 0 {
            return Err(CacheError::ConfigError {
                reason: "query_preview_len must be > 0".to_string(),
            });
        }
        if self.op_timeout.is_zero() {
            return Err(CacheError::ConfigError {
                reason: "op_timeout must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

use std::time::Duration;

use crate::constants::{
    BLOCKS_COLLECTION_NAME, BROAD_CANDIDATE_CAP, BROAD_TOP_K_THRESHOLD, CANDIDATE_CAP,
    DEFAULT_OP_TIMEOUT_SECS, DEFAULT_VECTOR_SIZE, MAX_TOKEN_OVERLAP_RATIO, OVERFETCH_MULTIPLIER,
};

use super::error::{RetrieverError, RetrieverResult};

#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    pub collection_name: String,
    pub vector_size: u64,
    /// Over-fetch factor applied to `top_k` before filtering stages.
    pub overfetch_multiplier: usize,
    /// Candidate cap for ordinary queries.
    pub candidate_cap: usize,
    /// Candidate cap for broad/statistical queries.
    pub broad_candidate_cap: usize,
    /// `top_k` at or above which the broad cap applies.
    pub broad_top_k: usize,
    /// Token-overlap ratio above which a candidate is pruned.
    pub max_token_overlap: f32,
    /// Timeout for embedding and index calls.
    pub op_timeout: Duration,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            collection_name: BLOCKS_COLLECTION_NAME.to_string(),
            vector_size: DEFAULT_VECTOR_SIZE,
            overfetch_multiplier: OVERFETCH_MULTIPLIER,
            candidate_cap: CANDIDATE_CAP,
            broad_candidate_cap: BROAD_CANDIDATE_CAP,
            broad_top_k: BROAD_TOP_K_THRESHOLD,
            max_token_overlap: MAX_TOKEN_OVERLAP_RATIO,
            op_timeout: Duration::from_secs(DEFAULT_OP_TIMEOUT_SECS),
        }
    }
}

impl RetrieverConfig {
    pub fn collection_name(mut self, name: &str) -> Self {
        self.collection_name = name.to_string();
        self
    }

    pub fn vector_size(mut self, size: u64) -> Self {
        self.vector_size = size;
        self
    }

    pub fn op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    pub fn max_token_overlap(mut self, ratio: f32) -> Self {
        self.max_token_overlap = ratio;
        self
    }

    pub fn validate(&self) -> RetrieverResult<()> {
        if self.collection_name.is_empty() {
            return Err(RetrieverError::ConfigError {
                reason: "collection_name must not be empty".to_string(),
            });
        }
        if self.vector_size == 0 {
            return Err(RetrieverError::ConfigError {
                reason: "vector_size must be > 0".to_string(),
            });
        }
        if self.overfetch_multiplier == 0 {
            return Err(RetrieverError::ConfigError {
                reason: "overfetch_multiplier must be > 0".to_string(),
            });
        }
        if self.candidate_cap == 0 {
            return Err(RetrieverError::ConfigError {
                reason: "candidate_cap must be > 0".to_string(),
            });
        }
        if self.broad_candidate_cap < self.candidate_cap {
            return Err(RetrieverError::ConfigError {
                reason: format!(
                    "broad_candidate_cap ({}) cannot be below candidate_cap ({})",
                    self.broad_candidate_cap, self.candidate_cap
                ),
            });
        }
        if !(self.max_token_overlap > 0.0 && self.max_token_overlap <= 1.0) {
            return Err(RetrieverError::ConfigError {
                reason: format!(
                    "max_token_overlap ({}) must be within (0, 1]",
                    self.max_token_overlap
                ),
            });
        }
        if self.op_timeout.is_zero() {
            return Err(RetrieverError::ConfigError {
                reason: "op_timeout must be > 0".to_string(),
            });
        }
        Ok(())
    }

    /// Raw candidate count requested from the index for a given `top_k`.
    ///
    /// Later stages discard candidates, so nearest-neighbor order alone would
    /// under-fill `top_k`; very large `top_k` signals a deliberately broad
    /// query and gets the higher cap.
    pub(crate) fn overfetch_limit(&self, top_k: usize) -> usize {
        let cap = if top_k >= self.broad_top_k {
            self.broad_candidate_cap
        } else {
            self.candidate_cap
        };

        (top_k * self.overfetch_multiplier).max(top_k).min(cap)
    }
}

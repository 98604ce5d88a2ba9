//! Environment-backed configuration.
//!
//! Most settings have defaults. Override with `THREADLENS_*` environment variables.

pub mod error;

#[cfg(test)]
mod tests;

pub use error::ConfigError;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    ANSWERS_COLLECTION_NAME, BLOCKS_COLLECTION_NAME, DEFAULT_EMBEDDING_DIM,
    DEFAULT_OP_TIMEOUT_SECS, DEFAULT_SESSION_TTL_SECS, DEFAULT_SIMILARITY_THRESHOLD,
};

/// Process configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `THREADLENS_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Qdrant endpoint URL. Default: `http://localhost:6334`.
    pub qdrant_url: String,

    /// File holding the Block Store snapshot. Default: `./.data/blocks.json`.
    pub store_path: PathBuf,

    /// Embedding dimensionality of the injected embedder. Default: `1536`.
    pub embedding_dim: usize,

    /// Collection holding indexed conversation blocks.
    pub blocks_collection: String,

    /// Collection holding cached answers.
    pub answers_collection: String,

    /// Minimum cosine similarity for a cache hit. Default: `0.96`.
    pub similarity_threshold: f32,

    /// TTL for session-scoped cache entries. Default: 12 hours.
    pub session_ttl: Duration,

    /// Timeout applied to embedding and vector-index calls. Default: 30s.
    pub op_timeout: Duration,
}

/// Default Qdrant URL used when `THREADLENS_QDRANT_URL` is not set.
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

impl Default for Config {
    fn default() -> Self {
        Self {
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            store_path: PathBuf::from("./.data/blocks.json"),
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            blocks_collection: BLOCKS_COLLECTION_NAME.to_string(),
            answers_collection: ANSWERS_COLLECTION_NAME.to_string(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            op_timeout: Duration::from_secs(DEFAULT_OP_TIMEOUT_SECS),
        }
    }
}

impl Config {
    const ENV_QDRANT_URL: &'static str = "THREADLENS_QDRANT_URL";
    const ENV_STORE_PATH: &'static str = "THREADLENS_STORE_PATH";
    const ENV_EMBEDDING_DIM: &'static str = "THREADLENS_EMBEDDING_DIM";
    const ENV_BLOCKS_COLLECTION: &'static str = "THREADLENS_BLOCKS_COLLECTION";
    const ENV_ANSWERS_COLLECTION: &'static str = "THREADLENS_ANSWERS_COLLECTION";
    const ENV_SIMILARITY_THRESHOLD: &'static str = "THREADLENS_SIMILARITY_THRESHOLD";
    const ENV_SESSION_TTL_SECS: &'static str = "THREADLENS_SESSION_TTL_SECS";
    const ENV_OP_TIMEOUT_SECS: &'static str = "THREADLENS_OP_TIMEOUT_SECS";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let qdrant_url = Self::parse_string_from_env(Self::ENV_QDRANT_URL, defaults.qdrant_url);
        let store_path = Self::parse_path_from_env(Self::ENV_STORE_PATH, defaults.store_path);
        let embedding_dim =
            Self::parse_usize_from_env(Self::ENV_EMBEDDING_DIM, defaults.embedding_dim)?;
        let blocks_collection =
            Self::parse_string_from_env(Self::ENV_BLOCKS_COLLECTION, defaults.blocks_collection);
        let answers_collection =
            Self::parse_string_from_env(Self::ENV_ANSWERS_COLLECTION, defaults.answers_collection);
        let similarity_threshold = Self::parse_f32_from_env(
            Self::ENV_SIMILARITY_THRESHOLD,
            defaults.similarity_threshold,
        )?;
        let session_ttl =
            Self::parse_duration_secs_from_env(Self::ENV_SESSION_TTL_SECS, defaults.session_ttl)?;
        let op_timeout =
            Self::parse_duration_secs_from_env(Self::ENV_OP_TIMEOUT_SECS, defaults.op_timeout)?;

        Ok(Self {
            qdrant_url,
            store_path,
            embedding_dim,
            blocks_collection,
            answers_collection,
            similarity_threshold,
            session_ttl,
            op_timeout,
        })
    }

    /// Validates value ranges and basic path sanity (does not create files).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.embedding_dim == 0 {
            return Err(ConfigError::ZeroValue {
                var: Self::ENV_EMBEDDING_DIM,
            });
        }

        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(ConfigError::ThresholdOutOfRange {
                value: self.similarity_threshold,
            });
        }

        if self.session_ttl.is_zero() {
            return Err(ConfigError::ZeroValue {
                var: Self::ENV_SESSION_TTL_SECS,
            });
        }

        if self.op_timeout.is_zero() {
            return Err(ConfigError::ZeroValue {
                var: Self::ENV_OP_TIMEOUT_SECS,
            });
        }

        if self.blocks_collection.is_empty() {
            return Err(ConfigError::EmptyValue {
                var: Self::ENV_BLOCKS_COLLECTION,
            });
        }

        if self.answers_collection.is_empty() {
            return Err(ConfigError::EmptyValue {
                var: Self::ENV_ANSWERS_COLLECTION,
            });
        }

        if self.blocks_collection == self.answers_collection {
            return Err(ConfigError::SameCollection {
                name: self.blocks_collection.clone(),
            });
        }

        if self.store_path.exists() && !self.store_path.is_file() {
            return Err(ConfigError::NotAFile {
                path: self.store_path.clone(),
            });
        }

        Ok(())
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name).unwrap_or(default)
    }

    fn parse_path_from_env(var_name: &str, default: PathBuf) -> PathBuf {
        env::var(var_name).map(PathBuf::from).unwrap_or(default)
    }

    fn parse_usize_from_env(var_name: &'static str, default: usize) -> Result<usize, ConfigError> {
        match env::var(var_name) {
            Ok(value) => value.parse().map_err(|e| ConfigError::IntParseError {
                var: var_name,
                value,
                source: e,
            }),
            Err(_) => Ok(default),
        }
    }

    fn parse_f32_from_env(var_name: &'static str, default: f32) -> Result<f32, ConfigError> {
        match env::var(var_name) {
            Ok(value) => value.parse().map_err(|e| ConfigError::FloatParseError {
                var: var_name,
                value,
                source: e,
            }),
            Err(_) => Ok(default),
        }
    }

    fn parse_duration_secs_from_env(
        var_name: &'static str,
        default: Duration,
    ) -> Result<Duration, ConfigError> {
        match env::var(var_name) {
            Ok(value) => {
                let secs: u64 = value.parse().map_err(|e| ConfigError::IntParseError {
                    var: var_name,
                    value,
                    source: e,
                })?;
                Ok(Duration::from_secs(secs))
            }
            Err(_) => Ok(default),
        }
    }
}

//! Semantic Response Cache.
//!
//! An independent vector index mapping previously-asked questions to
//! previously-generated answers, partitioned into per-session and global
//! pools, with TTL on session entries.

pub mod config;
pub mod error;
pub mod semantic;
pub mod types;

#[cfg(test)]
mod tests;

pub use config::CacheConfig;
pub use error::{CacheError, CacheResult};
pub use semantic::SemanticResponseCache;
pub use types::{CacheLookup, CacheScope, CacheStats, CachedAnswer};

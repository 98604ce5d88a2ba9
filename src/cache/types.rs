use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which pool a cache entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheScope {
    /// Valid only for lookups carrying the same session id; subject to TTL.
    Session,
    /// Valid for any lookup; no automatic expiry.
    Global,
}

impl CacheScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheScope::Session => "session",
            CacheScope::Global => "global",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "session" => Some(CacheScope::Session),
            "global" => Some(CacheScope::Global),
            _ => None,
        }
    }
}

/// A cached answer returned on a hit.
#[derive(Debug, Clone)]
pub struct CachedAnswer {
    pub response: String,
    /// Truncated preview of the query that produced the answer.
    pub original_query: String,
    pub scope: CacheScope,
    pub session_id: Option<String>,
    pub cached_at: DateTime<Utc>,
    /// Similarity between the lookup query and the cached query.
    pub similarity: f32,
    /// Opaque caller metadata stored with the entry.
    pub metadata: HashMap<String, String>,
}

/// Outcome of a cache lookup. A miss is a normal value, not a failure.
#[derive(Debug, Clone)]
pub enum CacheLookup {
    Hit(CachedAnswer),
    Miss,
}

impl CacheLookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }

    pub fn into_answer(self) -> Option<CachedAnswer> {
        match self {
            CacheLookup::Hit(answer) => Some(answer),
            CacheLookup::Miss => None,
        }
    }
}

/// Entry counts by scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub session_entries: u64,
    pub global_entries: u64,
}

impl CacheStats {
    pub fn total(&self) -> u64 {
        self.session_entries + self.global_entries
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Structured payload stored next to a vector.
///
/// Two collections (blocks and answers) share the client, so the payload is a
/// keyed map rather than a fixed struct; the typed views live with their
/// owners ([`crate::block::BlockMetadata`], the cache's entry codec).
pub type Payload = BTreeMap<String, PayloadValue>;

/// A single payload field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadValue {
    Text(String),
    Integer(i64),
}

impl PayloadValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PayloadValue::Text(s) => Some(s),
            PayloadValue::Integer(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PayloadValue::Integer(i) => Some(*i),
            PayloadValue::Text(_) => None,
        }
    }
}

impl From<String> for PayloadValue {
    fn from(value: String) -> Self {
        PayloadValue::Text(value)
    }
}

impl From<&str> for PayloadValue {
    fn from(value: &str) -> Self {
        PayloadValue::Text(value.to_string())
    }
}

impl From<i64> for PayloadValue {
    fn from(value: i64) -> Self {
        PayloadValue::Integer(value)
    }
}

/// A vector plus payload, addressed by a numeric point id.
#[derive(Debug, Clone)]
pub struct VectorPoint {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

impl VectorPoint {
    pub fn new(id: u64, vector: Vec<f32>, payload: Payload) -> Self {
        Self {
            id,
            vector,
            payload,
        }
    }
}

/// One nearest-neighbor result.
///
/// `score` is cosine similarity (`1 - cosine_distance`); higher is more
/// similar.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: u64,
    pub score: f32,
    pub payload: Payload,
}

/// A stored point surfaced by a scroll (no similarity involved).
#[derive(Debug, Clone)]
pub struct StoredPoint {
    pub id: u64,
    pub payload: Payload,
}

/// Exact-match condition on a payload text field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMatch {
    pub field: String,
    pub value: String,
}

/// Conjunction of exact-match conditions, applied server-side.
///
/// This is what partitions the answer cache into session/global pools: the
/// scope and session id live in the payload and every lookup filters on them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexFilter {
    pub must: Vec<FieldMatch>,
}

impl IndexFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an exact-match condition.
    pub fn matches(mut self, field: &str, value: &str) -> Self {
        self.must.push(FieldMatch {
            field: field.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
    }

    /// Applies the filter to a payload (used by the mock and by tests).
    pub fn accepts(&self, payload: &Payload) -> bool {
        self.must.iter().all(|cond| {
            payload
                .get(&cond.field)
                .and_then(PayloadValue::as_text)
                .is_some_and(|v| v == cond.value)
        })
    }
}

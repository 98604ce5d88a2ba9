use chrono::{DateTime, Utc};

use crate::block::{BlockMetadata, ConversationBlock};

use super::error::{RetrieverError, RetrieverResult};

/// Inclusive time window applied as a hard filter.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn since(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    pub fn until(end: DateTime<Utc>) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    /// Rejects windows whose end precedes their start, before any I/O.
    pub fn validate(&self) -> RetrieverResult<()> {
        if let (Some(start), Some(end)) = (self.start, self.end)
            && end < start
        {
            return Err(RetrieverError::InvalidWindow { start, end });
        }
        Ok(())
    }
}

/// Categorical ranking preferences. Soft: they bias order, they never empty
/// the result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SoftFilters {
    pub variant: Option<String>,
    pub sentiment: Option<String>,
    pub tags: Vec<String>,
}

impl SoftFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variant(mut self, variant: &str) -> Self {
        self.variant = Some(variant.to_string());
        self
    }

    pub fn sentiment(mut self, sentiment: &str) -> Self {
        self.sentiment = Some(sentiment.to_string());
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.variant.is_none() && self.sentiment.is_none() && self.tags.is_empty()
    }
}

/// Per-query knobs for [`super::IndexedRetriever::query`].
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub window: Option<TimeWindow>,
    pub filters: SoftFilters,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn window(mut self, window: TimeWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn filters(mut self, filters: SoftFilters) -> Self {
        self.filters = filters;
        self
    }
}

/// One ranked retrieval result: the hydrated block, its similarity score,
/// and the metadata snapshot taken at index time.
#[derive(Debug, Clone)]
pub struct RetrievedBlock {
    pub block: ConversationBlock,
    pub score: f32,
    pub metadata: BlockMetadata,
}

/// What an indexing call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexOutcome {
    /// Candidates merged into the Block Store map.
    pub merged: usize,
    /// New ids embedded and written to the index.
    pub indexed: usize,
    /// Ids skipped because they were already indexed.
    pub skipped: usize,
}

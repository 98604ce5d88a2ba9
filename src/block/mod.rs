//! Conversation block data model.
//!
//! A block is the atomic retrievable unit: one root message plus its replies,
//! merged by the (out-of-scope) ingestion pipeline and optionally enriched
//! before first indexing. Fields attached later by enrichment are modeled as
//! explicit `Option`s, never ad hoc attributes.


use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::vectordb::{Payload, PayloadValue};

/// Source tag stored in index metadata for direct-message blocks.
pub const SOURCE_TAG_DIRECT_MESSAGE: &str = "direct-message";

/// Source tag stored in index metadata for forum blocks.
pub const SOURCE_TAG_FORUM: &str = "forum";

fn default_sentiment() -> String {
    "unknown".to_string()
}

/// A single message inside a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub username: String,
    /// Naive inputs are interpreted in UTC at the parse boundary.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    pub text: String,
}

/// Where a block came from.
///
/// The kind is a tagged variant rather than presence checks on optional
/// fields, so retrieval code can match on it directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockOrigin {
    Forum {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_post_id: Option<String>,
    },
    DirectMessage {
        contact_identifier: String,
    },
}

/// A merged conversation unit: root message plus replies, with enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationBlock {
    /// Globally unique, stable identifier; the sole join key between the
    /// Block Store and the vector index.
    pub block_id: String,
    pub thread_id: String,
    pub root_message: ConversationMessage,
    /// Chronological, possibly empty.
    #[serde(default)]
    pub reply_messages: Vec<ConversationMessage>,
    /// Earliest message time; `start <= end` when both are present.
    #[serde(default)]
    pub start_datetime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_datetime: Option<DateTime<Utc>>,
    /// Concatenation of all message text; embedding and display input.
    pub flattened_text: String,
    pub dominant_variant: String,
    #[serde(default = "default_sentiment")]
    pub dominant_sentiment: String,
    #[serde(default)]
    pub aggregated_tags: BTreeSet<String>,
    /// Enrichment output; preferred over `flattened_text` for generation
    /// context when present.
    #[serde(default)]
    pub summary: Option<String>,
    pub origin: BlockOrigin,
}

impl ConversationBlock {
    /// Citation label for this block's source.
    ///
    /// Direct-message blocks always label as such; forum blocks with a known
    /// source post label as forum; otherwise the thread id decides (a
    /// `dm`-prefixed thread id means the block was merged from a
    /// direct-message history).
    pub fn source_tag(&self) -> &'static str {
        match &self.origin {
            BlockOrigin::DirectMessage { .. } => SOURCE_TAG_DIRECT_MESSAGE,
            BlockOrigin::Forum {
                source_post_id: Some(_),
            } => SOURCE_TAG_FORUM,
            BlockOrigin::Forum {
                source_post_id: None,
            } => {
                let lowered = self.thread_id.to_lowercase();
                if lowered.starts_with("dm") {
                    SOURCE_TAG_DIRECT_MESSAGE
                } else {
                    SOURCE_TAG_FORUM
                }
            }
        }
    }

    /// Text handed to the generation layer: summary when enriched, full
    /// flattened text otherwise.
    pub fn context_text(&self) -> &str {
        self.summary.as_deref().unwrap_or(&self.flattened_text)
    }

    /// Contact identifier for direct-message blocks.
    pub fn contact_identifier(&self) -> Option<&str> {
        match &self.origin {
            BlockOrigin::DirectMessage { contact_identifier } => Some(contact_identifier),
            BlockOrigin::Forum { .. } => None,
        }
    }

    /// Source post identifier for forum blocks.
    pub fn source_post_id(&self) -> Option<&str> {
        match &self.origin {
            BlockOrigin::Forum { source_post_id } => source_post_id.as_deref(),
            BlockOrigin::DirectMessage { .. } => None,
        }
    }

    /// The block's time span as stored on the record.
    pub fn time_span(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        (self.start_datetime, self.end_datetime)
    }

    /// Merges enrichment output into the block, field by field.
    pub fn apply_enrichment(&mut self, enrichment: &BlockEnrichment) {
        if let Some(summary) = &enrichment.summary {
            self.summary = Some(summary.clone());
        }
        if let Some(variant) = &enrichment.dominant_variant {
            self.dominant_variant = variant.clone();
        }
        if let Some(sentiment) = &enrichment.dominant_sentiment {
            self.dominant_sentiment = sentiment.clone();
        }
        if let Some(tags) = &enrichment.aggregated_tags {
            self.aggregated_tags = tags.clone();
        }
    }
}

/// Output of the (out-of-scope) enrichment step for one block.
///
/// Absent fields leave the block untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockEnrichment {
    pub block_id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub dominant_variant: Option<String>,
    #[serde(default)]
    pub dominant_sentiment: Option<String>,
    #[serde(default)]
    pub aggregated_tags: Option<BTreeSet<String>>,
}

/// Point-in-time metadata snapshot written next to a block's embedding.
///
/// The retriever prefers live Block Store fields when the block is resident
/// and falls back to this snapshot otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockMetadata {
    pub block_id: String,
    pub variant: String,
    pub sentiment: String,
    /// Tags joined with `", "`; order-irrelevant for matching.
    pub tags: String,
    pub source: String,
    /// RFC 3339, empty when the block has no start timestamp.
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub contact_identifier: Option<String>,
    #[serde(default)]
    pub source_post_id: Option<String>,
}

const PAYLOAD_BLOCK_ID: &str = "block_id";
const PAYLOAD_VARIANT: &str = "variant";
const PAYLOAD_SENTIMENT: &str = "sentiment";
const PAYLOAD_TAGS: &str = "tags";
const PAYLOAD_SOURCE: &str = "source";
const PAYLOAD_START: &str = "start";
const PAYLOAD_END: &str = "end";
const PAYLOAD_CONTACT: &str = "contact_identifier";
const PAYLOAD_SOURCE_POST: &str = "source_post_id";

impl BlockMetadata {
    /// Captures the snapshot for a block at index time.
    pub fn snapshot(block: &ConversationBlock) -> Self {
        let tags: Vec<&str> = block.aggregated_tags.iter().map(String::as_str).collect();
        Self {
            block_id: block.block_id.clone(),
            variant: block.dominant_variant.clone(),
            sentiment: block.dominant_sentiment.clone(),
            tags: tags.join(", "),
            source: block.source_tag().to_string(),
            start: block
                .start_datetime
                .map(|dt| dt.to_rfc3339())
                .unwrap_or_default(),
            end: block
                .end_datetime
                .map(|dt| dt.to_rfc3339())
                .unwrap_or_default(),
            contact_identifier: block.contact_identifier().map(str::to_string),
            source_post_id: block.source_post_id().map(str::to_string),
        }
    }

    /// Converts the snapshot into an index payload.
    pub fn to_payload(&self) -> Payload {
        let mut payload = BTreeMap::new();
        payload.insert(
            PAYLOAD_BLOCK_ID.to_string(),
            PayloadValue::Text(self.block_id.clone()),
        );
        payload.insert(
            PAYLOAD_VARIANT.to_string(),
            PayloadValue::Text(self.variant.clone()),
        );
        payload.insert(
            PAYLOAD_SENTIMENT.to_string(),
            PayloadValue::Text(self.sentiment.clone()),
        );
        payload.insert(
            PAYLOAD_TAGS.to_string(),
            PayloadValue::Text(self.tags.clone()),
        );
        payload.insert(
            PAYLOAD_SOURCE.to_string(),
            PayloadValue::Text(self.source.clone()),
        );
        payload.insert(
            PAYLOAD_START.to_string(),
            PayloadValue::Text(self.start.clone()),
        );
        payload.insert(PAYLOAD_END.to_string(), PayloadValue::Text(self.end.clone()));
        if let Some(contact) = &self.contact_identifier {
            payload.insert(
                PAYLOAD_CONTACT.to_string(),
                PayloadValue::Text(contact.clone()),
            );
        }
        if let Some(post) = &self.source_post_id {
            payload.insert(
                PAYLOAD_SOURCE_POST.to_string(),
                PayloadValue::Text(post.clone()),
            );
        }
        payload
    }

    /// Text handed to the embedder for this block: the flattened
    /// conversation plus the snapshot fields, so retrieval can match on
    /// categorical context as well as content.
    pub fn embedding_input(&self, flattened_text: &str) -> String {
        let mut input = String::with_capacity(flattened_text.len() + 128);
        input.push_str(flattened_text);
        input.push('\n');
        input.push_str(&format!(
            "variant: {} | sentiment: {} | tags: {} | source: {}",
            self.variant, self.sentiment, self.tags, self.source
        ));
        if !self.start.is_empty() || !self.end.is_empty() {
            input.push_str(&format!(" | from: {} | to: {}", self.start, self.end));
        }
        if let Some(contact) = &self.contact_identifier {
            input.push_str(&format!(" | contact: {contact}"));
        }
        if let Some(post) = &self.source_post_id {
            input.push_str(&format!(" | post: {post}"));
        }
        input
    }

    /// Rebuilds a snapshot from an index payload.
    ///
    /// Returns `None` when the payload lacks a block id, which marks the
    /// point as not ours (or written by an incompatible version).
    pub fn from_payload(payload: &Payload) -> Option<Self> {
        let text = |key: &str| {
            payload
                .get(key)
                .and_then(PayloadValue::as_text)
                .unwrap_or_default()
                .to_string()
        };

        let block_id = payload.get(PAYLOAD_BLOCK_ID)?.as_text()?.to_string();

        Some(Self {
            block_id,
            variant: text(PAYLOAD_VARIANT),
            sentiment: text(PAYLOAD_SENTIMENT),
            tags: text(PAYLOAD_TAGS),
            source: text(PAYLOAD_SOURCE),
            start: text(PAYLOAD_START),
            end: text(PAYLOAD_END),
            contact_identifier: payload
                .get(PAYLOAD_CONTACT)
                .and_then(PayloadValue::as_text)
                .map(str::to_string),
            source_post_id: payload
                .get(PAYLOAD_SOURCE_POST)
                .and_then(PayloadValue::as_text)
                .map(str::to_string),
        })
    }

    /// Parses the snapshot's time span, where resolvable.
    pub fn time_span(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        (parse_timestamp(&self.start), parse_timestamp(&self.end))
    }
}

/// Parses a timestamp string, assuming UTC for naive inputs.
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS[.f]`, `YYYY-MM-DD HH:MM:SS[.f]`,
/// and bare `YYYY-MM-DD` (midnight). Anything else is unresolvable.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }

    None
}

//! Test fixtures for integration tests.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use threadlens::{
    AnalyticsPipeline, BlockOrigin, Config, ConversationBlock, ConversationMessage,
    MockVectorIndex, StubEmbedder,
};

pub const EMBEDDING_DIM: usize = 16;

pub fn timestamp(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

#[derive(Default)]
pub struct BlockBuilder {
    block_id: Option<String>,
    thread_id: Option<String>,
    text: Option<String>,
    variant: Option<String>,
    sentiment: Option<String>,
    tags: BTreeSet<String>,
    span: Option<(DateTime<Utc>, DateTime<Utc>)>,
    contact: Option<String>,
}

impl BlockBuilder {
    pub fn new(block_id: &str) -> Self {
        Self {
            block_id: Some(block_id.to_string()),
            ..Self::default()
        }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn thread(mut self, thread_id: &str) -> Self {
        self.thread_id = Some(thread_id.to_string());
        self
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
        self.tags.insert(tag.to_string());
        self
    }

    pub fn span(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.span = Some((start, end));
        self
    }

    pub fn direct_message(mut self, contact: &str) -> Self {
        self.contact = Some(contact.to_string());
        self
    }

    pub fn build(self) -> ConversationBlock {
        let text = self.text.unwrap_or_else(|| "some conversation".to_string());
        let (start, end) = self
            .span
            .unwrap_or_else(|| (timestamp(1, 9), timestamp(1, 10)));

        ConversationBlock {
            block_id: self.block_id.expect("block id is required"),
            thread_id: self.thread_id.unwrap_or_else(|| "thread-1".to_string()),
            root_message: ConversationMessage {
                username: "alice".to_string(),
                created_at: Some(start),
                text: text.clone(),
            },
            reply_messages: Vec::new(),
            start_datetime: Some(start),
            end_datetime: Some(end),
            flattened_text: text,
            dominant_variant: self.variant.unwrap_or_else(|| "H6".to_string()),
            dominant_sentiment: self.sentiment.unwrap_or_else(|| "unknown".to_string()),
            aggregated_tags: self.tags,
            summary: None,
            origin: match self.contact {
                Some(contact_identifier) => BlockOrigin::DirectMessage { contact_identifier },
                None => BlockOrigin::Forum {
                    source_post_id: None,
                },
            },
        }
    }
}

pub struct PipelineHarness {
    pub _dir: tempfile::TempDir,
    pub index: Arc<MockVectorIndex>,
    pub embedder: Arc<StubEmbedder>,
    pub pipeline: AnalyticsPipeline<Arc<MockVectorIndex>, StubEmbedder>,
}

pub async fn spawn_pipeline() -> PipelineHarness {
    spawn_pipeline_with(StubEmbedder::new(EMBEDDING_DIM)).await
}

pub async fn spawn_pipeline_with(embedder: StubEmbedder) -> PipelineHarness {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Config {
        store_path: dir.path().join("blocks.json"),
        embedding_dim: EMBEDDING_DIM,
        ..Config::default()
    };

    let index = Arc::new(MockVectorIndex::new());
    let embedder = Arc::new(embedder);

    let pipeline = AnalyticsPipeline::new(Arc::clone(&index), Arc::clone(&embedder), &config)
        .expect("pipeline should wire up");
    pipeline.init().await.expect("init should succeed");

    PipelineHarness {
        _dir: dir,
        index,
        embedder,
        pipeline,
    }
}

//! End-to-end retrieval tests over the pipeline context (mock index + stub
//! embedder).

mod common;

use threadlens::{
    BlockEnrichment, Config, QueryOptions, RetrieverError, SoftFilters, TimeWindow,
};

use common::fixtures::{BlockBuilder, spawn_pipeline, timestamp};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[tokio::test]
async fn test_index_query_cycle() -> anyhow::Result<()> {
    init_tracing();
    let h = spawn_pipeline().await;

    let outcome = h
        .pipeline
        .index_blocks(
            vec![
                BlockBuilder::new("b1").text("brake noise after rain").build(),
                BlockBuilder::new("b2")
                    .text("infotainment screen freezes on cold mornings")
                    .build(),
            ],
            &[],
        )
        .await?;

    assert_eq!(outcome.merged, 2);
    assert_eq!(outcome.indexed, 2);

    let results = h
        .pipeline
        .query("brake noise after rain", 5, &QueryOptions::new())
        .await?;

    assert_eq!(results.len(), 2);
    let mut ids: Vec<&str> = results.iter().map(|r| r.block.block_id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["b1", "b2"]);
    for result in &results {
        assert_eq!(result.metadata.source, "forum");
    }

    Ok(())
}

#[tokio::test]
async fn test_double_indexing_embeds_once_per_id() -> anyhow::Result<()> {
    init_tracing();
    let h = spawn_pipeline().await;

    let batch = || vec![BlockBuilder::new("x").text("a very specific block").build()];

    h.pipeline.index_blocks(batch(), &[]).await?;
    h.pipeline.index_blocks(batch(), &[]).await?;

    // exactly one index entry and exactly one embedding call for X
    assert_eq!(
        h.index.point_count(&Config::default().blocks_collection),
        Some(1)
    );
    assert_eq!(h.embedder.total_embedded(), 1);

    Ok(())
}

#[tokio::test]
async fn test_enrichment_applied_before_indexing() -> anyhow::Result<()> {
    init_tracing();
    let h = spawn_pipeline().await;

    let enrichment = BlockEnrichment {
        block_id: "b1".to_string(),
        summary: Some("wet brake squeal reports".to_string()),
        dominant_sentiment: Some("negative".to_string()),
        ..BlockEnrichment::default()
    };

    h.pipeline
        .index_blocks(
            vec![BlockBuilder::new("b1").text("brake noise after rain").build()],
            std::slice::from_ref(&enrichment),
        )
        .await?;

    let results = h
        .pipeline
        .query("brake noise", 1, &QueryOptions::new())
        .await?;

    let block = &results[0].block;
    assert_eq!(block.summary.as_deref(), Some("wet brake squeal reports"));
    assert_eq!(block.context_text(), "wet brake squeal reports");
    assert_eq!(results[0].metadata.sentiment, "negative");

    Ok(())
}

#[tokio::test]
async fn test_time_window_is_a_hard_filter() -> anyhow::Result<()> {
    init_tracing();
    let h = spawn_pipeline().await;

    h.pipeline
        .index_blocks(
            vec![
                BlockBuilder::new("march-1")
                    .text("brake noise on the first")
                    .span(timestamp(1, 9), timestamp(1, 10))
                    .build(),
                BlockBuilder::new("march-5")
                    .text("brake noise on the fifth")
                    .span(timestamp(5, 9), timestamp(5, 10))
                    .build(),
            ],
            &[],
        )
        .await?;

    let options =
        QueryOptions::new().window(TimeWindow::between(timestamp(4, 0), timestamp(6, 0)));
    let results = h.pipeline.query("brake noise", 5, &options).await?;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].block.block_id, "march-5");

    let disjoint =
        QueryOptions::new().window(TimeWindow::between(timestamp(20, 0), timestamp(21, 0)));
    let results = h.pipeline.query("brake noise", 5, &disjoint).await?;
    assert!(results.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_malformed_window_is_a_validation_error() {
    init_tracing();
    let h = spawn_pipeline().await;

    let options =
        QueryOptions::new().window(TimeWindow::between(timestamp(6, 0), timestamp(4, 0)));

    let err = h
        .pipeline
        .query("anything", 3, &options)
        .await
        .expect_err("end < start must fail");

    let threadlens::PipelineError::Retriever(inner) = err else {
        panic!("expected retriever error");
    };
    assert!(matches!(inner, RetrieverError::InvalidWindow { .. }));
    assert!(!inner.is_transient());
}

#[tokio::test]
async fn test_soft_filters_bias_without_starving() -> anyhow::Result<()> {
    init_tracing();
    let h = spawn_pipeline().await;

    h.pipeline
        .index_blocks(
            vec![
                BlockBuilder::new("plain")
                    .text("brake noise after rain")
                    .variant("H5")
                    .build(),
                BlockBuilder::new("preferred")
                    .text("faint brake squeal in the wet")
                    .variant("H6")
                    .sentiment("negative")
                    .tag("brakes")
                    .build(),
            ],
            &[],
        )
        .await?;

    // the preferred partition leads even when raw similarity favors "plain"
    let options = QueryOptions::new().filters(SoftFilters::new().variant("h6"));
    let results = h
        .pipeline
        .query("brake noise after rain", 5, &options)
        .await?;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].block.block_id, "preferred");

    // a filter matching nothing must not empty the result set
    let starving = QueryOptions::new().filters(SoftFilters::new().variant("H9"));
    let results = h
        .pipeline
        .query("brake noise after rain", 5, &starving)
        .await?;
    assert_eq!(results.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_verbatim_duplicates_are_suppressed() -> anyhow::Result<()> {
    init_tracing();
    let h = spawn_pipeline().await;

    h.pipeline
        .index_blocks(
            vec![
                BlockBuilder::new("a").text("brake noise after rain").build(),
                BlockBuilder::new("b").text("brake noise after rain").build(),
                BlockBuilder::new("c").text("brake noise after rain").build(),
                BlockBuilder::new("d")
                    .text("totally different topic about seat covers")
                    .build(),
            ],
            &[],
        )
        .await?;

    let results = h
        .pipeline
        .query("brake issues", 3, &QueryOptions::new())
        .await?;

    let verbatim = results
        .iter()
        .filter(|r| r.block.flattened_text == "brake noise after rain")
        .count();
    assert_eq!(verbatim, 1, "only one of the three copies may survive");

    Ok(())
}

#[tokio::test]
async fn test_direct_message_blocks_carry_source_tag() -> anyhow::Result<()> {
    init_tracing();
    let h = spawn_pipeline().await;

    h.pipeline
        .index_blocks(
            vec![
                BlockBuilder::new("dm1")
                    .text("customer asked about trade-in value")
                    .direct_message("cust-42")
                    .thread("dm:cust-42")
                    .build(),
            ],
            &[],
        )
        .await?;

    let results = h
        .pipeline
        .query("trade-in value", 1, &QueryOptions::new())
        .await?;

    assert_eq!(results[0].metadata.source, "direct-message");
    assert_eq!(results[0].metadata.contact_identifier.as_deref(), Some("cust-42"));

    Ok(())
}

#[tokio::test]
async fn test_store_survives_restart() -> anyhow::Result<()> {
    init_tracing();
    let h = spawn_pipeline().await;

    h.pipeline
        .index_blocks(
            vec![BlockBuilder::new("b1").text("persisted across restarts").build()],
            &[],
        )
        .await?;

    // a second pipeline over the same store path sees the block
    let store_path = h.pipeline.store().path().to_path_buf();
    let config = Config {
        store_path,
        embedding_dim: common::fixtures::EMBEDDING_DIM,
        ..Config::default()
    };
    let reopened = threadlens::AnalyticsPipeline::new(
        std::sync::Arc::clone(&h.index),
        std::sync::Arc::clone(&h.embedder),
        &config,
    )?;
    reopened.init().await?;

    let results = reopened
        .query("persisted across restarts", 1, &QueryOptions::new())
        .await?;
    assert_eq!(results.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_transient_index_failure_is_retryable() -> anyhow::Result<()> {
    init_tracing();
    let h = spawn_pipeline().await;

    h.index.fail_next_upsert();

    let batch = vec![BlockBuilder::new("b1").text("retry me").build()];
    let err = h
        .pipeline
        .index_blocks(batch.clone(), &[])
        .await
        .expect_err("injected failure must surface");
    assert!(err.is_transient());

    // blocks stayed merged in memory, nothing was indexed or persisted
    assert!(h.pipeline.store().contains("b1"));
    assert_eq!(
        h.index.point_count(&Config::default().blocks_collection),
        Some(0)
    );

    let outcome = h.pipeline.index_blocks(batch, &[]).await?;
    assert_eq!(outcome.indexed, 1);

    Ok(())
}

#[tokio::test]
async fn test_stats_reports_store_and_cache() -> anyhow::Result<()> {
    init_tracing();
    let h = spawn_pipeline().await;

    h.pipeline
        .index_blocks(
            vec![
                BlockBuilder::new("b1").text("first").build(),
                BlockBuilder::new("b2").text("second").build(),
            ],
            &[],
        )
        .await?;

    let stats = h.pipeline.stats().await?;
    assert_eq!(stats.resident_blocks, 2);
    assert_eq!(stats.cache.total(), 0);

    Ok(())
}

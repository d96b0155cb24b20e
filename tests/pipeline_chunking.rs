// tests/pipeline_chunking.rs
//! Yield accounting through an injected host: one yield per section plus one
//! per raw-data chunk, and progress only after a yield.

use async_trait::async_trait;
use insight_extractor::insights::config::PipelineConfig;
use insight_extractor::{HostYield, Insight, InsightPipeline, IntelligenceAggregate, Section};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct CountingYield {
    count: AtomicUsize,
}

#[async_trait]
impl HostYield for CountingYield {
    async fn yield_now(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
    }
}

fn raw_points(n: usize) -> IntelligenceAggregate {
    let points: Vec<_> = (0..n)
        .map(|i| json!({"kind": "question", "content": format!("Question number {i} about pricing")}))
        .collect();
    serde_json::from_value(json!({ "rawDataPoints": points })).unwrap()
}

fn pipeline_with(chunk_size: usize) -> (InsightPipeline, Arc<CountingYield>) {
    let host = Arc::new(CountingYield::default());
    let config = PipelineConfig {
        chunk_size,
        ..PipelineConfig::default()
    };
    (InsightPipeline::with_yielder(config, host.clone()), host)
}

/// Every section except raw data points yields exactly once.
const FIXED_YIELDS: usize = Section::ORDER.len() - 1;

#[tokio::test]
async fn sixty_points_yield_three_chunks() {
    let (pipeline, host) = pipeline_with(25);
    let out = pipeline.run(Some(&raw_points(60)), None, None).await.unwrap();

    assert_eq!(out.len(), 60);
    let yields = host.count.load(Ordering::SeqCst);
    assert!(yields >= 3);
    assert_eq!(yields, FIXED_YIELDS + 3);
}

#[tokio::test]
async fn chunk_yields_are_ceil_of_count() {
    for (n, chunks) in [(0usize, 0usize), (1, 1), (25, 1), (26, 2), (50, 2), (51, 3), (125, 5)] {
        let (pipeline, host) = pipeline_with(25);
        pipeline.run(Some(&raw_points(n)), None, None).await.unwrap();
        assert_eq!(host.count.load(Ordering::SeqCst), FIXED_YIELDS + chunks, "n = {n}");
    }
}

#[tokio::test]
async fn progress_follows_each_yield_and_only_grows() {
    let (pipeline, host) = pipeline_with(25);
    let mut reports: Vec<(String, usize, usize)> = Vec::new();
    let counter = host.clone();
    let mut on_progress = |acc: &[Insight], label: &str| {
        reports.push((label.to_string(), acc.len(), counter.count.load(Ordering::SeqCst)));
    };

    pipeline
        .run(Some(&raw_points(60)), None, Some(&mut on_progress))
        .await
        .unwrap();

    // First report comes after the first yield; each report sees one more yield.
    for (i, (_, _, yields)) in reports.iter().enumerate() {
        assert_eq!(*yields, i + 1);
    }
    assert!(reports.windows(2).all(|w| w[0].1 <= w[1].1));

    let chunk_labels: Vec<(&str, usize)> = reports
        .iter()
        .filter(|(l, _, _)| l.starts_with("raw_data_points"))
        .map(|(l, len, _)| (l.as_str(), *len))
        .collect();
    assert_eq!(
        chunk_labels,
        vec![
            ("raw_data_points:1/3", 25),
            ("raw_data_points:2/3", 50),
            ("raw_data_points:3/3", 60)
        ]
    );
    assert_eq!(reports.last().map(|r| r.0.as_str()), Some("value_proposition"));
}

#[tokio::test]
async fn smaller_chunks_keep_ids_stable() {
    let (coarse, _) = pipeline_with(25);
    let (fine, host) = pipeline_with(7);
    let agg = raw_points(30);

    let a = coarse.run(Some(&agg), None, None).await.unwrap();
    let b = fine.run(Some(&agg), None, None).await.unwrap();

    assert_eq!(a, b);
    assert_eq!(host.count.load(Ordering::SeqCst), FIXED_YIELDS + 5);
    assert_eq!(b.last().map(|i| i.id.as_str()), Some("dp-29"));
}

// tests/pipeline_cancellation.rs
//! A newer run supersedes an older one on the same pipeline: the older run
//! resolves empty and never reports progress after being superseded.

use insight_extractor::{
    Insight, InsightPipeline, IntelligenceAggregate, PipelineState, RunOutcome,
};
use serde_json::json;

fn aggregate(tag: &str, n: usize) -> IntelligenceAggregate {
    let points: Vec<_> = (0..n)
        .map(|i| json!({"kind": "review", "content": format!("{tag} customer review number {i}")}))
        .collect();
    serde_json::from_value(json!({
        "trends": [format!("{tag} demand keeps growing")],
        "marketGaps": [format!("{tag} has no weekend coverage")],
        "rawDataPoints": points
    }))
    .unwrap()
}

#[tokio::test]
async fn second_run_supersedes_first() {
    let pipeline = InsightPipeline::default();
    let first = aggregate("Alpha", 60);
    let second = aggregate("Beta", 60);

    let mut first_reports = 0usize;
    let mut second_reports = 0usize;
    let mut on_first = |_: &[Insight], _: &str| first_reports += 1;
    let mut on_second = |_: &[Insight], _: &str| second_reports += 1;

    let (a, b) = tokio::join!(
        pipeline.run_tracked(Some(&first), None, Some(&mut on_first)),
        pipeline.run_tracked(Some(&second), None, Some(&mut on_second)),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a, RunOutcome::Superseded { generation: 1 });
    assert_eq!(first_reports, 0, "superseded run must not report");

    assert_eq!(b.generation(), 2);
    let insights = b.into_insights();
    assert_eq!(insights.len(), 62);
    assert!(insights.iter().all(|i| !i.title.contains("Alpha")));
    assert!(second_reports > 0);
    assert_eq!(pipeline.state(), PipelineState::Completed { generation: 2 });
}

#[tokio::test]
async fn superseded_run_returns_empty_list() {
    let pipeline = InsightPipeline::default();
    let first = aggregate("Alpha", 10);
    let second = aggregate("Beta", 10);

    let (a, b) = tokio::join!(
        pipeline.run(Some(&first), None, None),
        pipeline.run(Some(&second), None, None),
    );
    assert!(a.unwrap().is_empty());
    assert_eq!(b.unwrap().len(), 12);
}

#[tokio::test]
async fn cancel_mid_run_stops_progress() {
    let pipeline = InsightPipeline::default();
    let agg = aggregate("Gamma", 100);

    let mut labels: Vec<String> = Vec::new();
    let mut seen_lens: Vec<usize> = Vec::new();
    let mut on_progress = |acc: &[Insight], label: &str| {
        labels.push(label.to_string());
        seen_lens.push(acc.len());
        if label == "raw_data_points:2/4" {
            pipeline.cancel();
        }
    };

    let out = pipeline
        .run_tracked(Some(&agg), None, Some(&mut on_progress))
        .await
        .unwrap();

    assert!(out.is_superseded());
    assert_eq!(labels.last().map(String::as_str), Some("raw_data_points:2/4"));
    assert!(seen_lens.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(pipeline.state(), PipelineState::Superseded { generation: 1 });

    // The pipeline is reusable after cancellation.
    let again = pipeline.run(Some(&agg), None, None).await.unwrap();
    assert_eq!(again.len(), 102);
    assert_eq!(pipeline.generation(), 3);
}

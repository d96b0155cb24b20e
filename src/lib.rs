// src/lib.rs
// Public library surface for the CLI and integration tests.

pub mod insights;
pub mod preview;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::insights::config::{load_config_default, load_config_from, InsightsConfig};
pub use crate::insights::{
    classify, extract_with_fallback, CacheStats, Category, HostYield, Insight, InsightCache,
    InsightPipeline, InsightSource, IntelligenceAggregate, PipelineState, RunOutcome, Section,
    TokioYield, ValuePropositionContext,
};
pub use crate::preview::{
    ContentGenerator, LivePreview, PreviewContent, PreviewEvent, PreviewRequest, PreviewState,
};

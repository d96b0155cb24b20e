// src/insights/scheduler.rs
//! Cooperative scheduler: runs the extractors in fixed order on the caller's
//! task, yielding to the host after every section and every raw-data chunk.
//!
//! Run lifecycle: `Idle → Running(g) → {Completed(g) | Superseded(g)}`.
//! Each run captures a generation from the pipeline's counter; starting a newer
//! run (or calling [`InsightPipeline::cancel`]) bumps the counter, and the
//! older run notices at its next checkpoint and unwinds with an empty result.
//!
//! Checkpoint order: check generation → yield → check generation → report
//! progress. A superseded run therefore never reports after being superseded.

use super::aggregate::{IntelligenceAggregate, ValuePropositionContext};
use super::cache::{CacheStats, InsightCache};
use super::config::PipelineConfig;
use super::ensure_metrics_described;
use super::extractors::{self, extract_raw_chunk};
use super::types::{Insight, Section};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use metrics::{counter, gauge, histogram};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Host capability the scheduler suspends through between units of work.
#[async_trait]
pub trait HostYield: Send + Sync {
    async fn yield_now(&self);
}

/// Yields back to the Tokio scheduler so other tasks on the executor can run.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioYield;

#[async_trait]
impl HostYield for TokioYield {
    async fn yield_now(&self) {
        tokio::task::yield_now().await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running { generation: u64 },
    Completed { generation: u64 },
    Superseded { generation: u64 },
    Failed { generation: u64 },
}

impl PipelineState {
    fn generation(&self) -> Option<u64> {
        match *self {
            PipelineState::Idle => None,
            PipelineState::Running { generation }
            | PipelineState::Completed { generation }
            | PipelineState::Superseded { generation }
            | PipelineState::Failed { generation } => Some(generation),
        }
    }
}

/// Result of one run, tagged with the generation it ran under.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed {
        generation: u64,
        insights: Vec<Insight>,
    },
    Superseded {
        generation: u64,
    },
}

impl RunOutcome {
    pub fn generation(&self) -> u64 {
        match self {
            RunOutcome::Completed { generation, .. } | RunOutcome::Superseded { generation } => {
                *generation
            }
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, RunOutcome::Superseded { .. })
    }

    /// Superseded runs have no insights.
    pub fn into_insights(self) -> Vec<Insight> {
        match self {
            RunOutcome::Completed { insights, .. } => insights,
            RunOutcome::Superseded { .. } => Vec::new(),
        }
    }
}

/// Progress callback: the accumulator so far and the label of the step that just finished.
pub type ProgressFn<'a> = &'a mut (dyn FnMut(&[Insight], &str) + Send);

/// One extraction pipeline instance. Owns its generation counter, run state
/// and memoization cache; nothing is global.
pub struct InsightPipeline {
    config: PipelineConfig,
    generation: AtomicU64,
    state: Mutex<PipelineState>,
    cache: Mutex<InsightCache>,
    yielder: Arc<dyn HostYield>,
}

impl std::fmt::Debug for InsightPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsightPipeline")
            .field("config", &self.config)
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl Default for InsightPipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl InsightPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_yielder(config, Arc::new(TokioYield))
    }

    pub fn with_yielder(config: PipelineConfig, yielder: Arc<dyn HostYield>) -> Self {
        Self {
            config,
            generation: AtomicU64::new(0),
            state: Mutex::new(PipelineState::Idle),
            cache: Mutex::new(InsightCache::with_capacity(config.cache_capacity)),
            yielder,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Generation of the most recent run (0 before the first run).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> PipelineState {
        match self.state.lock() {
            Ok(g) => *g,
            Err(poison) => *poison.into_inner(),
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        match self.cache.lock() {
            Ok(g) => g.stats(),
            Err(poison) => poison.into_inner().stats(),
        }
    }

    pub fn clear_cache(&self) {
        if let Ok(mut g) = self.cache.lock() {
            g.clear();
        }
    }

    /// Supersede whatever run is in flight without starting a new one.
    pub fn cancel(&self) {
        let bumped = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut st) = self.state.lock() {
            if let PipelineState::Running { generation } = *st {
                *st = PipelineState::Superseded { generation };
            }
        }
        debug!(target: "insights", generation = bumped, "extraction cancelled");
    }

    /// Run the full extraction and return the ordered insights; a superseded
    /// run resolves to an empty list.
    pub async fn run(
        &self,
        aggregate: Option<&IntelligenceAggregate>,
        context: Option<&ValuePropositionContext>,
        on_progress: Option<ProgressFn<'_>>,
    ) -> anyhow::Result<Vec<Insight>> {
        Ok(self
            .run_tracked(aggregate, context, on_progress)
            .await?
            .into_insights())
    }

    /// Like [`run`](Self::run) but reports which generation produced the
    /// result, for callers that key UI state off run identity.
    pub async fn run_tracked(
        &self,
        aggregate: Option<&IntelligenceAggregate>,
        context: Option<&ValuePropositionContext>,
        mut on_progress: Option<ProgressFn<'_>>,
    ) -> anyhow::Result<RunOutcome> {
        ensure_metrics_described();
        let generation = self.begin();
        let started = Instant::now();

        let empty = IntelligenceAggregate::default();
        let agg = aggregate.unwrap_or(&empty);
        let chunk_size = self.config.chunk_size.max(1);

        let mut acc: Vec<Insight> = Vec::with_capacity(agg.record_count() + 8);
        let mut seen: HashSet<String> = HashSet::with_capacity(acc.capacity());

        for section in Section::ORDER {
            if section == Section::RawDataPoints {
                let n = agg.raw_data_points.len().div_ceil(chunk_size);
                for (k, chunk) in agg.raw_data_points.chunks(chunk_size).enumerate() {
                    push_unique(&mut acc, &mut seen, extract_raw_chunk(chunk, k * chunk_size));
                    let label = format!("{}:{}/{}", section.label(), k + 1, n);
                    if !self
                        .checkpoint(generation, &acc, &label, &mut on_progress)
                        .await
                    {
                        return Ok(self.superseded(generation));
                    }
                }
                continue;
            }

            let batch = match self.extract_section(section, agg, context) {
                Ok(b) => b,
                Err(e) => {
                    self.transition(generation, PipelineState::Failed { generation });
                    return Err(e.context(format!("extracting section {}", section.label())));
                }
            };
            debug!(target: "insights", generation, section = section.label(), count = batch.len(), "section extracted");
            push_unique(&mut acc, &mut seen, batch);

            if !self
                .checkpoint(generation, &acc, section.label(), &mut on_progress)
                .await
            {
                return Ok(self.superseded(generation));
            }
        }

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.transition(generation, PipelineState::Completed { generation });
        histogram!("insight_run_ms").record(elapsed_ms);
        gauge!("insight_pipeline_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);
        info!(
            target: "insights",
            generation,
            records = acc.len(),
            elapsed_ms = elapsed_ms as u64,
            "extraction run completed"
        );

        Ok(RunOutcome::Completed {
            generation,
            insights: acc,
        })
    }

    /// Capture a new generation; any older run is superseded from here on.
    fn begin(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        counter!("insight_runs_total").increment(1);
        if let Ok(mut st) = self.state.lock() {
            if let PipelineState::Running { generation: prev } = *st {
                debug!(target: "insights", prev, next = generation, "superseding running extraction");
            }
            *st = PipelineState::Running { generation };
        }
        generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Only the run that owns the recorded state may move it forward.
    fn transition(&self, generation: u64, next: PipelineState) {
        if let Ok(mut st) = self.state.lock() {
            if st.generation() == Some(generation) {
                *st = next;
            }
        }
    }

    fn superseded(&self, generation: u64) -> RunOutcome {
        self.transition(generation, PipelineState::Superseded { generation });
        counter!("insight_runs_superseded_total").increment(1);
        debug!(target: "insights", generation, "extraction superseded; discarding partial results");
        RunOutcome::Superseded { generation }
    }

    /// Returns `false` when the run has been superseded.
    async fn checkpoint(
        &self,
        generation: u64,
        acc: &[Insight],
        label: &str,
        on_progress: &mut Option<ProgressFn<'_>>,
    ) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.yielder.yield_now().await;
        if !self.is_current(generation) {
            return false;
        }
        if let Some(report) = on_progress.as_mut() {
            report(acc, label);
        }
        true
    }

    fn extract_section(
        &self,
        section: Section,
        agg: &IntelligenceAggregate,
        context: Option<&ValuePropositionContext>,
    ) -> anyhow::Result<Vec<Insight>> {
        Ok(match section {
            Section::Trends => {
                let mut cache = self
                    .cache
                    .lock()
                    .map_err(|_| anyhow!("insight cache mutex poisoned"))?;
                extractors::extract_trends(agg, &mut cache).context("trend extraction")?
            }
            Section::UnmetNeeds => extractors::extract_unmet_needs(agg),
            Section::EmotionalTriggers => extractors::extract_emotional_triggers(agg),
            Section::CompetitiveBlindSpots => extractors::extract_competitive_blind_spots(agg),
            Section::MarketGaps => extractors::extract_market_gaps(agg),
            Section::LocalEvents => extractors::extract_local_events(agg),
            Section::CulturalMoments => extractors::extract_cultural_moments(agg),
            Section::KeyInsights => extractors::extract_key_insights(agg),
            Section::HiddenPatterns => extractors::extract_hidden_patterns(agg),
            Section::RawDataPoints => extractors::extract_raw_data_points(agg),
            Section::CorrelatedInsights => extractors::extract_correlated_insights(agg),
            Section::Breakthroughs => extractors::extract_breakthroughs(agg),
            Section::ValueProposition => extractors::extract_value_proposition(context),
        })
    }
}

/// Append `batch`, renaming ids already taken in this run (`id-2`, `id-3`, ...).
fn push_unique(acc: &mut Vec<Insight>, seen: &mut HashSet<String>, batch: Vec<Insight>) {
    for mut insight in batch {
        if !seen.insert(insight.id.clone()) {
            let base = insight.id.clone();
            let mut n = 2usize;
            loop {
                let candidate = format!("{base}-{n}");
                if seen.insert(candidate.clone()) {
                    insight.id = candidate;
                    break;
                }
                n += 1;
            }
        }
        acc.push(insight);
    }
}

/// Full extraction with the documented fallback: if the run fails, log it and
/// return the context-only (value-proposition) records instead of nothing.
pub async fn extract_with_fallback(
    pipeline: &InsightPipeline,
    aggregate: Option<&IntelligenceAggregate>,
    context: Option<&ValuePropositionContext>,
    on_progress: Option<ProgressFn<'_>>,
) -> Vec<Insight> {
    match pipeline.run(aggregate, context, on_progress).await {
        Ok(v) => v,
        Err(e) => {
            warn!(target: "insights", error = ?e, "extraction failed; falling back to value proposition only");
            extractors::extract_value_proposition(context)
        }
    }
}

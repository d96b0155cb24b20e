// src/insights/extractors/mod.rs
//! Source extractors: one pure function per aggregate section.
//!
//! Every extractor reads only its own sub-collection, decodes each record
//! through the section's shape enum, and assembles insights through
//! [`assemble`], which owns the shared rules (degenerate-title skip, per-section
//! confidence default, time-sensitivity default, evidence/source
//! normalization). A malformed record is skipped and counted; it never aborts
//! the section.

pub mod moments;
pub mod raw;
pub mod research;
pub mod synthesis;
pub mod value_prop;

pub use moments::{extract_cultural_moments, extract_local_events};
pub use raw::{extract_raw_chunk, extract_raw_data_points};
pub use research::{
    extract_competitive_blind_spots, extract_emotional_triggers, extract_market_gaps,
    extract_trends, extract_unmet_needs,
};
pub use synthesis::{
    extract_breakthroughs, extract_correlated_insights, extract_hidden_patterns,
    extract_key_insights,
};
pub use value_prop::extract_value_proposition;

use super::aggregate::CommonFields;
use super::types::{Category, Insight, InsightSource, Section};
use super::{derive_title, normalize_text};
use metrics::counter;
use serde_json::Value;

/// Fixed per-section defaults applied when a record omits the field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionDefaults {
    pub category: Category,
    pub confidence: f32,
    pub time_sensitive: bool,
}

pub fn defaults(section: Section) -> SectionDefaults {
    let (category, confidence, time_sensitive) = match section {
        Section::Trends => (Category::Trends, 0.70, true),
        Section::UnmetNeeds => (Category::Gaps, 0.75, false),
        Section::EmotionalTriggers => (Category::Triggers, 0.70, false),
        Section::CompetitiveBlindSpots => (Category::Gaps, 0.70, false),
        Section::MarketGaps => (Category::Gaps, 0.65, false),
        Section::LocalEvents => (Category::Trends, 0.60, true),
        Section::CulturalMoments => (Category::Trends, 0.60, true),
        Section::KeyInsights => (Category::Triggers, 0.80, false),
        Section::HiddenPatterns => (Category::Gaps, 0.65, false),
        Section::RawDataPoints => (super::taxonomy::DEFAULT_CATEGORY, 0.60, false),
        Section::CorrelatedInsights => (Category::Proof, 0.80, false),
        Section::Breakthroughs => (Category::Gaps, 0.85, false),
        Section::ValueProposition => (Category::Proof, 0.90, false),
    };
    SectionDefaults {
        category,
        confidence,
        time_sensitive,
    }
}

/// Section-specific pieces of one record, ready for assembly.
#[derive(Debug, Default)]
pub(crate) struct Parts {
    /// Text the title is derived from.
    pub headline: String,
    /// Full text; falls back to `headline` when absent.
    pub description: Option<String>,
    pub category: Option<Category>,
    pub time_sensitive: Option<bool>,
    pub evidence: Vec<String>,
    pub sources: Vec<InsightSource>,
}

/// Identity of a record within its section: explicit id or `<prefix>-<index>`.
pub(crate) fn record_id(section: Section, index: usize, common: &CommonFields) -> String {
    common
        .explicit_id()
        .unwrap_or_else(|| format!("{}-{}", section.id_prefix(), index))
}

/// Shared assembly rules. Returns `None` (and counts the skip) for degenerate text.
pub(crate) fn assemble(
    section: Section,
    index: usize,
    raw: &Value,
    mut common: CommonFields,
    parts: Parts,
) -> Option<Insight> {
    let d = defaults(section);

    let headline = normalize_text(&parts.headline);
    let title = match derive_title(&headline) {
        Some(t) => t,
        None => {
            note_skipped(section, index, "degenerate title");
            return None;
        }
    };
    let description = parts
        .description
        .map(|s| normalize_text(&s))
        .filter(|s| !s.is_empty())
        .unwrap_or(headline);

    let mut evidence = common.take_evidence();
    evidence.extend(parts.evidence);
    let mut sources = common.take_sources();
    sources.extend(parts.sources);

    let category = parts.category.unwrap_or(d.category);
    let is_time_sensitive = common
        .is_time_sensitive
        .or(parts.time_sensitive)
        .unwrap_or(d.time_sensitive);

    Some(Insight {
        id: record_id(section, index, &common),
        category,
        section,
        title,
        description,
        confidence: common.confidence().unwrap_or(d.confidence),
        is_time_sensitive,
        evidence,
        sources,
        raw_payload: raw.clone(),
    })
}

/// First non-blank candidate, in order.
pub(crate) fn first_text(candidates: &[&Option<String>]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|c| c.as_deref())
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Pass through a required text, counting the skip when it is missing.
pub(crate) fn require(section: Section, index: usize, text: Option<String>) -> Option<String> {
    if text.is_none() {
        note_skipped(section, index, "missing text field");
    }
    text
}

pub(crate) fn note_skipped(section: Section, index: usize, reason: &'static str) {
    tracing::debug!(target: "insights", section = section.label(), index, reason, "record skipped");
    counter!("insight_records_skipped_total", "section" => section.label()).increment(1);
}

pub(crate) fn note_emitted(section: Section, count: usize) {
    if count > 0 {
        counter!("insight_records_total", "section" => section.label()).increment(count as u64);
    }
}

/// Run a simple (uncached) extractor over one sub-collection.
pub(crate) fn extract_each<F>(section: Section, records: &[Value], mut build: F) -> Vec<Insight>
where
    F: FnMut(usize, &Value) -> Option<Insight>,
{
    let out: Vec<Insight> = records
        .iter()
        .enumerate()
        .filter_map(|(i, raw)| build(i, raw))
        .collect();
    note_emitted(section, out.len());
    out
}

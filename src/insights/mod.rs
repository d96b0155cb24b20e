// src/insights/mod.rs
pub mod aggregate;
pub mod cache;
pub mod config;
pub mod extractors;
pub mod scheduler;
pub mod taxonomy;
pub mod types;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

pub use aggregate::{IntelligenceAggregate, ValuePropositionContext};
pub use cache::{CacheStats, InsightCache};
pub use scheduler::{
    extract_with_fallback, HostYield, InsightPipeline, PipelineState, RunOutcome, TokioYield,
};
pub use taxonomy::classify;
pub use types::{Category, Insight, InsightSource, Section};

/// Records whose text has fewer alphanumeric characters than this are not worth a card.
pub const MIN_TITLE_CHARS: usize = 3;
/// Titles longer than this are cut at a word boundary and get an ellipsis.
pub const TITLE_MAX_CHARS: usize = 60;
/// Descriptions are capped to keep downstream prompts bounded.
pub const DESCRIPTION_MAX_CHARS: usize = 1500;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("insight_runs_total", "Extraction runs started.");
        describe_counter!(
            "insight_runs_superseded_total",
            "Extraction runs abandoned because a newer run started."
        );
        describe_counter!("insight_records_total", "Insights emitted by extractors.");
        describe_counter!(
            "insight_records_skipped_total",
            "Sub-records skipped as malformed or degenerate."
        );
        describe_counter!("insight_cache_hits_total", "Memoization cache hits.");
        describe_counter!("insight_cache_misses_total", "Memoization cache misses.");
        describe_counter!(
            "insight_cache_evictions_total",
            "Entries evicted from the memoization cache."
        );
        describe_histogram!("insight_run_ms", "Completed run duration in milliseconds.");
        describe_gauge!(
            "insight_pipeline_last_run_ts",
            "Unix ts when the pipeline last completed a run."
        );
    });
}

/// Normalize text: decode entities, strip tags, fold quotes, collapse whitespace, cap length.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 5) Length cap
    if out.chars().count() > DESCRIPTION_MAX_CHARS {
        out = out.chars().take(DESCRIPTION_MAX_CHARS).collect();
    }

    out
}

fn alnum_count(s: &str) -> usize {
    s.chars().filter(|c| c.is_alphanumeric()).count()
}

/// True when the text carries enough signal to become a card.
pub fn is_meaningful(s: &str) -> bool {
    alnum_count(s) >= MIN_TITLE_CHARS
}

/// Derive a short title from the first sentence-like clause of `text`.
///
/// Splits on sentence punctuation followed by whitespace, on spaced dashes and
/// on common conjunctions. Falls back to the whole text when the first clause
/// is too short; returns `None` when even the whole text is degenerate.
pub fn derive_title(text: &str) -> Option<String> {
    static RE_CLAUSE: OnceCell<regex::Regex> = OnceCell::new();
    let re = RE_CLAUSE.get_or_init(|| {
        regex::Regex::new(
            r"(?i)[.!?;:,](?:\s|$)|\s+[-\u{2013}\u{2014}]+\s+|\s+(?:and|but|or|because|while|so|which|although|though|whereas)(?:\s|$)",
        )
        .unwrap()
    });

    let text = text.trim();
    if !is_meaningful(text) {
        return None;
    }
    let clause = re
        .find(text)
        .map(|m| text[..m.start()].trim())
        .unwrap_or(text);
    let base = if is_meaningful(clause) { clause } else { text };
    Some(truncate_title(base, TITLE_MAX_CHARS))
}

/// Cut to at most `max` chars (ellipsis included), preferring a word boundary.
pub fn truncate_title(s: &str, max: usize) -> String {
    let trimmed = s.trim().trim_end_matches(['.', ',', ';', ':', '!', '?']);
    if trimmed.chars().count() <= max {
        return trimmed.to_string();
    }
    let keep = max.saturating_sub(3);
    let head: String = trimmed.chars().take(keep).collect();
    let cut = match head.rfind(' ') {
        Some(i) if i >= keep / 2 => &head[..i],
        _ => head.as_str(),
    };
    format!("{}...", cut.trim_end_matches([' ', ',', ';', ':', '-']))
}

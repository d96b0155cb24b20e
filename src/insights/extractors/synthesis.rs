// src/insights/extractors/synthesis.rs
//! Synthesized sections: AI key insights and hidden patterns, cross-source
//! correlated insights, and breakthrough opportunities.

use super::{assemble, extract_each, first_text, note_skipped, require, Parts};
use crate::insights::aggregate::{decode_record, lenient, CommonFields, TextList};
use crate::insights::taxonomy;
use crate::insights::types::{Insight, Section};
use crate::insights::IntelligenceAggregate;
use serde::Deserialize;

/* ----------------------------
Key insights
---------------------------- */

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StatementRecord {
    Text(String),
    Fields(StatementFields),
}

#[derive(Debug, Deserialize)]
struct StatementFields {
    #[serde(default, deserialize_with = "lenient")]
    insight: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    statement: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    text: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    description: Option<String>,
}

/// Synthesis statements are mostly free text. A record that names its own
/// kind is classified by it; otherwise the section default applies.
pub fn extract_key_insights(agg: &IntelligenceAggregate) -> Vec<Insight> {
    let section = Section::KeyInsights;
    extract_each(section, &agg.synthesis.key_insights, |index, raw| {
        let Some(rec) = decode_record::<StatementRecord>(raw) else {
            note_skipped(section, index, "malformed record");
            return None;
        };
        let common = CommonFields::of(raw);
        let parts = match rec {
            StatementRecord::Text(s) => Parts {
                headline: s,
                ..Parts::default()
            },
            StatementRecord::Fields(f) => Parts {
                headline: require(
                    section,
                    index,
                    first_text(&[&f.insight, &f.statement, &f.title, &f.text, &f.description]),
                )?,
                description: f.description,
                category: common.kind_tag().and_then(taxonomy::lookup),
                ..Parts::default()
            },
        };
        assemble(section, index, raw, common, parts)
    })
}

/* ----------------------------
Hidden patterns
---------------------------- */

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PatternRecord {
    Text(String),
    Fields(PatternFields),
}

#[derive(Debug, Deserialize)]
struct PatternFields {
    #[serde(default, deserialize_with = "lenient")]
    pattern: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    implication: Option<String>,
}

pub fn extract_hidden_patterns(agg: &IntelligenceAggregate) -> Vec<Insight> {
    let section = Section::HiddenPatterns;
    extract_each(section, &agg.synthesis.hidden_patterns, |index, raw| {
        let Some(rec) = decode_record::<PatternRecord>(raw) else {
            note_skipped(section, index, "malformed record");
            return None;
        };
        let parts = match rec {
            PatternRecord::Text(s) => Parts {
                headline: s,
                ..Parts::default()
            },
            PatternRecord::Fields(f) => Parts {
                headline: require(
                    section,
                    index,
                    first_text(&[&f.pattern, &f.title, &f.description]),
                )?,
                evidence: first_text(&[&f.implication])
                    .map(|i| vec![format!("Implication: {i}")])
                    .unwrap_or_default(),
                description: f.description,
                ..Parts::default()
            },
        };
        assemble(section, index, raw, CommonFields::of(raw), parts)
    })
}

/* ----------------------------
Correlated insights
---------------------------- */

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CorrelatedRecord {
    Text(String),
    Fields(CorrelatedFields),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CorrelatedFields {
    #[serde(default, deserialize_with = "lenient")]
    insight: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    supporting_data: Option<TextList>,
}

/// Cross-source insights default to `Proof`: agreement between independent
/// sources is the credibility signal.
pub fn extract_correlated_insights(agg: &IntelligenceAggregate) -> Vec<Insight> {
    let section = Section::CorrelatedInsights;
    extract_each(section, &agg.correlated_insights, |index, raw| {
        let Some(rec) = decode_record::<CorrelatedRecord>(raw) else {
            note_skipped(section, index, "malformed record");
            return None;
        };
        let common = CommonFields::of(raw);
        let parts = match rec {
            CorrelatedRecord::Text(s) => Parts {
                headline: s,
                ..Parts::default()
            },
            CorrelatedRecord::Fields(f) => Parts {
                headline: require(
                    section,
                    index,
                    first_text(&[&f.insight, &f.title, &f.description]),
                )?,
                description: f.description,
                evidence: f.supporting_data.map(TextList::into_vec).unwrap_or_default(),
                category: common.kind_tag().and_then(taxonomy::lookup),
                ..Parts::default()
            },
        };
        assemble(section, index, raw, common, parts)
    })
}

/* ----------------------------
Breakthroughs
---------------------------- */

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BreakthroughRecord {
    Text(String),
    Fields(BreakthroughFields),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BreakthroughFields {
    #[serde(default, deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    opportunity: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    urgency: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    expected_impact: Option<String>,
}

fn is_urgent(urgency: Option<&str>) -> bool {
    matches!(
        urgency.map(|u| u.trim().to_ascii_lowercase()).as_deref(),
        Some("high" | "critical" | "urgent" | "immediate")
    )
}

pub fn extract_breakthroughs(agg: &IntelligenceAggregate) -> Vec<Insight> {
    let section = Section::Breakthroughs;
    extract_each(section, &agg.breakthroughs, |index, raw| {
        let Some(rec) = decode_record::<BreakthroughRecord>(raw) else {
            note_skipped(section, index, "malformed record");
            return None;
        };
        let parts = match rec {
            BreakthroughRecord::Text(s) => Parts {
                headline: s,
                ..Parts::default()
            },
            BreakthroughRecord::Fields(f) => Parts {
                headline: require(
                    section,
                    index,
                    first_text(&[&f.title, &f.opportunity, &f.description]),
                )?,
                evidence: first_text(&[&f.expected_impact])
                    .map(|i| vec![format!("Expected impact: {i}")])
                    .unwrap_or_default(),
                time_sensitive: Some(is_urgent(f.urgency.as_deref())),
                description: f.description,
                ..Parts::default()
            },
        };
        assemble(section, index, raw, CommonFields::of(raw), parts)
    })
}

// src/insights/extractors/research.rs
//! Research-feed sections: trends, unmet needs, emotional triggers,
//! competitive blind spots and market gaps.

use super::{assemble, extract_each, first_text, note_emitted, note_skipped, require, Parts};
use crate::insights::aggregate::{decode_record, lenient, CommonFields, TextList};
use crate::insights::cache::InsightCache;
use crate::insights::types::{Insight, InsightSource, Section};
use crate::insights::IntelligenceAggregate;
use serde::Deserialize;
use serde_json::Value;

/* ----------------------------
Trends (memoized)
---------------------------- */

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TrendRecord {
    Text(String),
    Fields(TrendFields),
}

#[derive(Debug, Deserialize)]
struct TrendFields {
    #[serde(default, deserialize_with = "lenient")]
    trend: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    topic: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    description: Option<String>,
}

fn build_trend(index: usize, raw: &Value) -> Option<Insight> {
    let section = Section::Trends;
    let Some(rec) = decode_record::<TrendRecord>(raw) else {
        note_skipped(section, index, "malformed record");
        return None;
    };
    let parts = match rec {
        TrendRecord::Text(s) => Parts {
            headline: s,
            ..Parts::default()
        },
        TrendRecord::Fields(f) => {
            let headline = require(
                section,
                index,
                first_text(&[&f.trend, &f.title, &f.name, &f.topic, &f.description]),
            )?;
            Parts {
                headline,
                description: f.description,
                ..Parts::default()
            }
        }
    };
    assemble(section, index, raw, CommonFields::of(raw), parts)
}

/// Trend records are the highest-churn section, so each built insight is
/// memoized by content hash and reused across runs.
pub fn extract_trends(
    agg: &IntelligenceAggregate,
    cache: &mut InsightCache,
) -> anyhow::Result<Vec<Insight>> {
    let mut out = Vec::with_capacity(agg.trends.len());
    for (index, raw) in agg.trends.iter().enumerate() {
        let identity = trend_identity(index, raw);
        let key = InsightCache::key(&identity, raw)?;
        if let Some(insight) = cache.get_or_build(&key, || build_trend(index, raw)) {
            out.push(insight);
        }
    }
    note_emitted(Section::Trends, out.len());
    Ok(out)
}

/// Cheap identity for keying: the explicit id when present, otherwise the
/// position. Avoids decoding the record on the hit path.
fn trend_identity(index: usize, raw: &Value) -> String {
    match raw.get("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => format!("{}-{}", Section::Trends.id_prefix(), index),
    }
}

/* ----------------------------
Unmet needs
---------------------------- */

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NeedRecord {
    Text(String),
    Fields(NeedFields),
}

#[derive(Debug, Deserialize)]
struct NeedFields {
    #[serde(default, deserialize_with = "lenient")]
    need: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    insight: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    text: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    description: Option<String>,
}

pub fn extract_unmet_needs(agg: &IntelligenceAggregate) -> Vec<Insight> {
    let section = Section::UnmetNeeds;
    extract_each(section, &agg.unmet_needs, |index, raw| {
        let Some(rec) = decode_record::<NeedRecord>(raw) else {
            note_skipped(section, index, "malformed record");
            return None;
        };
        let parts = match rec {
            NeedRecord::Text(s) => Parts {
                headline: s,
                ..Parts::default()
            },
            NeedRecord::Fields(f) => Parts {
                headline: require(
                    section,
                    index,
                    first_text(&[&f.need, &f.title, &f.insight, &f.text, &f.description]),
                )?,
                description: f.description,
                ..Parts::default()
            },
        };
        assemble(section, index, raw, CommonFields::of(raw), parts)
    })
}

/* ----------------------------
Emotional triggers
---------------------------- */

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TriggerRecord {
    Text(String),
    Fields(TriggerFields),
}

#[derive(Debug, Deserialize)]
struct TriggerFields {
    #[serde(default, deserialize_with = "lenient")]
    trigger: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    emotion: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    examples: Option<TextList>,
}

pub fn extract_emotional_triggers(agg: &IntelligenceAggregate) -> Vec<Insight> {
    let section = Section::EmotionalTriggers;
    extract_each(section, &agg.emotional_triggers, |index, raw| {
        let Some(rec) = decode_record::<TriggerRecord>(raw) else {
            note_skipped(section, index, "malformed record");
            return None;
        };
        let parts = match rec {
            TriggerRecord::Text(s) => Parts {
                headline: s,
                ..Parts::default()
            },
            TriggerRecord::Fields(f) => Parts {
                headline: require(
                    section,
                    index,
                    first_text(&[&f.trigger, &f.title, &f.description, &f.emotion]),
                )?,
                description: f.description,
                evidence: f.examples.map(TextList::into_vec).unwrap_or_default(),
                ..Parts::default()
            },
        };
        assemble(section, index, raw, CommonFields::of(raw), parts)
    })
}

/* ----------------------------
Competitive blind spots
---------------------------- */

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BlindSpotRecord {
    Text(String),
    Fields(BlindSpotFields),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlindSpotFields {
    #[serde(default, alias = "blind_spot", deserialize_with = "lenient")]
    blind_spot: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    gap: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    topic: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    opportunity: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    competitors: Option<TextList>,
}

pub fn extract_competitive_blind_spots(agg: &IntelligenceAggregate) -> Vec<Insight> {
    let section = Section::CompetitiveBlindSpots;
    extract_each(section, &agg.competitive_blind_spots, |index, raw| {
        let Some(rec) = decode_record::<BlindSpotRecord>(raw) else {
            note_skipped(section, index, "malformed record");
            return None;
        };
        let parts = match rec {
            BlindSpotRecord::Text(s) => Parts {
                headline: s,
                ..Parts::default()
            },
            BlindSpotRecord::Fields(f) => {
                let headline = require(
                    section,
                    index,
                    first_text(&[&f.blind_spot, &f.gap, &f.topic, &f.description]),
                )?;
                let mut evidence = Vec::new();
                if let Some(op) = first_text(&[&f.opportunity]) {
                    evidence.push(format!("Opportunity: {op}"));
                }
                // Competitors missing the angle are where the evidence was seen.
                let sources = f
                    .competitors
                    .map(TextList::into_vec)
                    .unwrap_or_default()
                    .into_iter()
                    .map(InsightSource::named)
                    .collect();
                Parts {
                    headline,
                    description: f.description,
                    evidence,
                    sources,
                    ..Parts::default()
                }
            }
        };
        assemble(section, index, raw, CommonFields::of(raw), parts)
    })
}

/* ----------------------------
Market gaps
---------------------------- */

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GapRecord {
    Text(String),
    Fields(GapFields),
}

#[derive(Debug, Deserialize)]
struct GapFields {
    #[serde(default, deserialize_with = "lenient")]
    gap: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    opportunity: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    description: Option<String>,
}

pub fn extract_market_gaps(agg: &IntelligenceAggregate) -> Vec<Insight> {
    let section = Section::MarketGaps;
    extract_each(section, &agg.market_gaps, |index, raw| {
        let Some(rec) = decode_record::<GapRecord>(raw) else {
            note_skipped(section, index, "malformed record");
            return None;
        };
        let parts = match rec {
            GapRecord::Text(s) => Parts {
                headline: s,
                ..Parts::default()
            },
            GapRecord::Fields(f) => Parts {
                headline: require(
                    section,
                    index,
                    first_text(&[&f.gap, &f.title, &f.opportunity, &f.description]),
                )?,
                description: f.description,
                ..Parts::default()
            },
        };
        assemble(section, index, raw, CommonFields::of(raw), parts)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::types::Category;
    use serde_json::json;

    fn agg(v: serde_json::Value) -> IntelligenceAggregate {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn trend_record_matches_documented_scenario() {
        let a = agg(json!({"trends": [
            {"trend": "Remote work adoption is rising, and", "evidence": "survey X shows 40%"}
        ]}));
        let mut cache = InsightCache::default();
        let out = extract_trends(&a, &mut cache).unwrap();
        assert_eq!(out.len(), 1);
        let i = &out[0];
        assert_eq!(i.id, "trend-0");
        assert_eq!(i.category, Category::Trends);
        assert_eq!(i.title, "Remote work adoption is rising");
        assert!(i.is_time_sensitive);
        assert_eq!(i.evidence, vec!["survey X shows 40%".to_string()]);
        assert!((i.confidence - 0.70).abs() < f32::EPSILON);
    }

    #[test]
    fn trends_are_served_from_cache_on_repeat() {
        let a = agg(json!({"trends": ["Solar panels at record lows", {"trend": "EV charging at home"}]}));
        let mut cache = InsightCache::default();
        let first = extract_trends(&a, &mut cache).unwrap();
        let second = extract_trends(&a, &mut cache).unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.stats().misses, 2);
        assert_eq!(cache.stats().hits, 2);
    }

    #[test]
    fn malformed_and_degenerate_records_are_skipped() {
        let a = agg(json!({"unmetNeeds": [
            42,
            {"confidence": 0.9},
            "ok",
            {"need": "Same-day repair appointments", "confidence": 0.9}
        ]}));
        let out = extract_unmet_needs(&a);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "need-3");
        assert_eq!(out[0].category, Category::Gaps);
        assert!((out[0].confidence - 0.9).abs() < f32::EPSILON);
        assert!(!out[0].is_time_sensitive);
    }

    #[test]
    fn blind_spot_collects_competitors_and_opportunity() {
        let a = agg(json!({"competitiveBlindSpots": [{
            "blindSpot": "Nobody talks about maintenance costs",
            "opportunity": "Lead with total cost of ownership",
            "competitors": "Acme; Globex"
        }]}));
        let out = extract_competitive_blind_spots(&a);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].evidence, vec!["Opportunity: Lead with total cost of ownership".to_string()]);
        let names: Vec<_> = out[0].sources.iter().map(|s| s.platform.as_str()).collect();
        assert_eq!(names, vec!["Acme", "Globex"]);
    }

    #[test]
    fn trigger_examples_become_evidence() {
        let a = agg(json!({"emotionalTriggers": [{
            "trigger": "Fear of overpaying",
            "examples": ["I felt ripped off", "never again"],
            "evidence": "forum thread"
        }]}));
        let out = extract_emotional_triggers(&a);
        assert_eq!(out[0].category, Category::Triggers);
        assert_eq!(
            out[0].evidence,
            vec![
                "forum thread".to_string(),
                "I felt ripped off".to_string(),
                "never again".to_string()
            ]
        );
    }
}

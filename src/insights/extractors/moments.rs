// src/insights/extractors/moments.rs
//! Time-bound sections: local events and cultural moments. Both default to
//! time-sensitive.

use super::{assemble, extract_each, first_text, note_skipped, require, Parts};
use crate::insights::aggregate::{decode_record, lenient, CommonFields};
use crate::insights::types::{Insight, InsightSource, Section};
use crate::insights::IntelligenceAggregate;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EventRecord {
    Text(String),
    Fields(EventFields),
}

#[derive(Debug, Deserialize)]
struct EventFields {
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    event: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    location: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    url: Option<String>,
}

pub fn extract_local_events(agg: &IntelligenceAggregate) -> Vec<Insight> {
    let section = Section::LocalEvents;
    extract_each(section, &agg.local_events, |index, raw| {
        let Some(rec) = decode_record::<EventRecord>(raw) else {
            note_skipped(section, index, "malformed record");
            return None;
        };
        let parts = match rec {
            EventRecord::Text(s) => Parts {
                headline: s,
                ..Parts::default()
            },
            EventRecord::Fields(f) => {
                let headline = require(
                    section,
                    index,
                    first_text(&[&f.name, &f.title, &f.event, &f.description]),
                )?;
                let mut evidence = Vec::new();
                if let Some(when) = first_text(&[&f.date]) {
                    evidence.push(format!("When: {when}"));
                }
                if let Some(wher) = first_text(&[&f.location]) {
                    evidence.push(format!("Where: {wher}"));
                }
                // An event listing with a link is its own source.
                let sources = first_text(&[&f.url])
                    .map(|url| InsightSource {
                        platform: "event listing".to_string(),
                        quote: None,
                        timestamp: f.date.clone(),
                        url: Some(url),
                    })
                    .into_iter()
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

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MomentRecord {
    Text(String),
    Fields(MomentFields),
}

#[derive(Debug, Deserialize)]
struct MomentFields {
    #[serde(default, deserialize_with = "lenient")]
    moment: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    relevance: Option<String>,
}

pub fn extract_cultural_moments(agg: &IntelligenceAggregate) -> Vec<Insight> {
    let section = Section::CulturalMoments;
    extract_each(section, &agg.cultural_moments, |index, raw| {
        let Some(rec) = decode_record::<MomentRecord>(raw) else {
            note_skipped(section, index, "malformed record");
            return None;
        };
        let parts = match rec {
            MomentRecord::Text(s) => Parts {
                headline: s,
                ..Parts::default()
            },
            MomentRecord::Fields(f) => Parts {
                headline: require(
                    section,
                    index,
                    first_text(&[&f.moment, &f.name, &f.title, &f.description]),
                )?,
                evidence: first_text(&[&f.relevance])
                    .map(|r| vec![format!("Relevance: {r}")])
                    .unwrap_or_default(),
                description: f.description,
                ..Parts::default()
            },
        };
        assemble(section, index, raw, CommonFields::of(raw), parts)
    })
}

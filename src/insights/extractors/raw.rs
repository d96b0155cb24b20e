// src/insights/extractors/raw.rs
//! Raw tagged data points: the large heterogeneous section. Each record
//! carries its own `kind` tag, which goes through the taxonomy instead of a
//! fixed section category. The scheduler feeds this extractor in chunks via
//! [`extract_raw_chunk`].

use super::{assemble, note_emitted, note_skipped, require, first_text, Parts};
use crate::insights::aggregate::{decode_record, lenient, CommonFields};
use crate::insights::taxonomy::classify;
use crate::insights::types::{Category, Insight, InsightSource, Section};
use crate::insights::IntelligenceAggregate;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DataPointRecord {
    Text(String),
    Fields(DataPointFields),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataPointFields {
    #[serde(default, deserialize_with = "lenient")]
    content: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    text: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    quote: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    author: Option<String>,
}

fn build_data_point(index: usize, raw: &Value) -> Option<Insight> {
    let section = Section::RawDataPoints;
    let Some(rec) = decode_record::<DataPointRecord>(raw) else {
        note_skipped(section, index, "malformed record");
        return None;
    };
    let common = CommonFields::of(raw);
    let category = classify(common.kind_tag().unwrap_or_default());

    let parts = match rec {
        DataPointRecord::Text(s) => Parts {
            headline: s,
            category: Some(category),
            ..Parts::default()
        },
        DataPointRecord::Fields(f) => {
            let text = require(
                section,
                index,
                first_text(&[&f.content, &f.text, &f.quote, &f.title]),
            )?;
            // The data point itself is the quote; the platform tag says where it was seen.
            let platform = common.platform.as_deref().and_then(|p| {
                let p = p.trim();
                (!p.is_empty()).then(|| p.to_string())
            });
            let sources = platform
                .map(|platform| InsightSource {
                    platform,
                    quote: Some(crate::insights::normalize_text(&text)),
                    timestamp: common.timestamp.clone(),
                    url: common.url.clone(),
                })
                .into_iter()
                .collect();
            let evidence = first_text(&[&f.author])
                .map(|a| vec![format!("Posted by {a}")])
                .unwrap_or_default();
            Parts {
                headline: text,
                category: Some(category),
                evidence,
                sources,
                ..Parts::default()
            }
        }
    };
    let time_sensitive = category == Category::Trends;
    assemble(
        section,
        index,
        raw,
        common,
        Parts {
            time_sensitive: Some(time_sensitive),
            ..parts
        },
    )
}

/// Extract one chunk of raw data points. `offset` is the chunk's position in
/// the full section so derived ids stay stable across chunk boundaries.
pub fn extract_raw_chunk(points: &[Value], offset: usize) -> Vec<Insight> {
    let out: Vec<Insight> = points
        .iter()
        .enumerate()
        .filter_map(|(i, raw)| build_data_point(offset + i, raw))
        .collect();
    note_emitted(Section::RawDataPoints, out.len());
    out
}

/// Whole-section convenience for callers that do not need chunking.
pub fn extract_raw_data_points(agg: &IntelligenceAggregate) -> Vec<Insight> {
    extract_raw_chunk(&agg.raw_data_points, 0)
}

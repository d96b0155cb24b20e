// src/insights/aggregate.rs
//! Input side of the pipeline: the intelligence aggregate, the value-proposition
//! context, and the tolerant shape variants raw sub-records arrive in.
//!
//! Scrapers and synthesis passes disagree on field names and on whether a field
//! is a string, a `;`-delimited string or an array. Every such field decodes
//! through a shape enum here, so extractors only ever see the
//! canonical forms (`Vec<String>`, `Vec<InsightSource>`, `Option<f32>`).

use super::normalize_text;
use anyhow::Context;
use super::types::InsightSource;
use serde::de::DeserializeOwned;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/* ----------------------------
Aggregate
---------------------------- */

/// Accumulated output of all research sources for one subject.
/// Never mutated by the pipeline.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntelligenceAggregate {
    #[serde(default, deserialize_with = "lenient_list")]
    pub trends: Vec<Value>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub unmet_needs: Vec<Value>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub emotional_triggers: Vec<Value>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub competitive_blind_spots: Vec<Value>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub market_gaps: Vec<Value>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub local_events: Vec<Value>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub cultural_moments: Vec<Value>,
    #[serde(default, deserialize_with = "lenient_synthesis")]
    pub synthesis: Synthesis,
    #[serde(default, alias = "dataPoints", deserialize_with = "lenient_list")]
    pub raw_data_points: Vec<Value>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub correlated_insights: Vec<Value>,
    #[serde(default, alias = "breakthroughOpportunities", deserialize_with = "lenient_list")]
    pub breakthroughs: Vec<Value>,
}

/// AI synthesis output nested under `synthesis`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Synthesis {
    #[serde(default, deserialize_with = "lenient_list")]
    pub key_insights: Vec<Value>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub hidden_patterns: Vec<Value>,
}

impl IntelligenceAggregate {
    pub fn from_json_str(s: &str) -> anyhow::Result<Self> {
        serde_json::from_str(s).context("parsing intelligence aggregate")
    }

    /// Total number of sub-records across all sections.
    pub fn record_count(&self) -> usize {
        self.trends.len()
            + self.unmet_needs.len()
            + self.emotional_triggers.len()
            + self.competitive_blind_spots.len()
            + self.market_gaps.len()
            + self.local_events.len()
            + self.cultural_moments.len()
            + self.synthesis.key_insights.len()
            + self.synthesis.hidden_patterns.len()
            + self.raw_data_points.len()
            + self.correlated_insights.len()
            + self.breakthroughs.len()
    }
}

/// Value-proposition context supplied alongside the aggregate.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuePropositionContext {
    #[serde(default, deserialize_with = "lenient")]
    pub target_customer: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub key_benefit: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub transformation: Option<Transformation>,
    #[serde(default, deserialize_with = "lenient")]
    pub unique_solution: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub proof_points: Option<TextList>,
}

impl ValuePropositionContext {
    pub fn from_json_str(s: &str) -> anyhow::Result<Self> {
        serde_json::from_str(s).context("parsing value-proposition context")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Transformation {
    Text(String),
    BeforeAfter {
        #[serde(default)]
        before: Option<String>,
        #[serde(default)]
        after: Option<String>,
    },
}

impl Transformation {
    pub fn to_text(&self) -> String {
        match self {
            Transformation::Text(s) => s.clone(),
            Transformation::BeforeAfter { before, after } => match (before, after) {
                (Some(b), Some(a)) => format!("From {b} to {a}"),
                (None, Some(a)) => a.clone(),
                (Some(b), None) => b.clone(),
                (None, None) => String::new(),
            },
        }
    }
}

/* ----------------------------
Lenient field decoding
---------------------------- */

/// Any non-array value (missing, null, object, string) becomes an empty section.
fn lenient_list<'de, D>(d: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    })
}

fn lenient_synthesis<'de, D>(d: D) -> Result<Synthesis, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.and_then(|v| Synthesis::deserialize(&v).ok())
        .unwrap_or_default())
}

/// Optional field that degrades to `None` instead of failing the whole record.
pub(crate) fn lenient<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.and_then(|v| T::deserialize(&v).ok()))
}

/// Decode one sub-record into a section shape. Only strings and objects are
/// candidates; anything else is malformed.
pub(crate) fn decode_record<T: DeserializeOwned>(raw: &Value) -> Option<T> {
    match raw {
        Value::String(_) | Value::Object(_) => T::deserialize(raw).ok(),
        _ => None,
    }
}

/* ----------------------------
Shape variants
---------------------------- */

/// A list of short strings: one string, a `;`-delimited string, or an array.
///
/// Array elements are kept raw and decoded one by one in [`TextList::into_vec`],
/// so a malformed element drops only itself.
#[derive(Debug, Clone)]
pub enum TextList {
    One(String),
    Many(Vec<Value>),
}

impl<'de> Deserialize<'de> for TextList {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(d)? {
            Value::String(s) => Ok(TextList::One(s)),
            Value::Array(items) => Ok(TextList::Many(items)),
            other => Err(D::Error::custom(format!(
                "expected string or array for text list, got {other}"
            ))),
        }
    }
}

/// Object form of one evidence entry.
#[derive(Debug, Deserialize)]
struct QuotedText {
    #[serde(alias = "quote", alias = "content")]
    text: String,
}

fn text_item(v: Value) -> Option<String> {
    match v {
        Value::String(s) => Some(normalize_text(&s)),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(_) => QuotedText::deserialize(&v)
            .ok()
            .map(|q| normalize_text(&q.text)),
        _ => None,
    }
}

impl TextList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            TextList::One(s) => split_delimited(&s),
            TextList::Many(items) => items
                .into_iter()
                .filter_map(text_item)
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

/// Sources: a platform name, a `;`-delimited list of names, one source object,
/// or an array of names and/or source objects. Array elements decode
/// independently, as in [`TextList`].
#[derive(Debug, Clone)]
pub enum SourceList {
    One(String),
    Single(Value),
    Many(Vec<Value>),
}

impl<'de> Deserialize<'de> for SourceList {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(d)? {
            Value::String(s) => Ok(SourceList::One(s)),
            obj @ Value::Object(_) => Ok(SourceList::Single(obj)),
            Value::Array(items) => Ok(SourceList::Many(items)),
            other => Err(D::Error::custom(format!(
                "expected string, object or array for sources, got {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceFields {
    #[serde(alias = "name", alias = "source", alias = "site")]
    pub platform: String,
    #[serde(default, alias = "text", alias = "content", deserialize_with = "lenient")]
    pub quote: Option<String>,
    #[serde(default, alias = "date", alias = "publishedAt", deserialize_with = "lenient")]
    pub timestamp: Option<String>,
    #[serde(default, alias = "link", deserialize_with = "lenient")]
    pub url: Option<String>,
}

fn source_item(v: Value) -> Option<InsightSource> {
    match v {
        Value::String(n) => {
            let n = normalize_text(&n);
            (!n.is_empty()).then(|| InsightSource::named(n))
        }
        Value::Object(_) => SourceFields::deserialize(&v).ok()?.into_source(),
        _ => None,
    }
}

impl SourceFields {
    fn into_source(self) -> Option<InsightSource> {
        let platform = normalize_text(&self.platform);
        if platform.is_empty() {
            return None;
        }
        Some(InsightSource {
            platform,
            quote: self
                .quote
                .map(|q| normalize_text(&q))
                .filter(|q| !q.is_empty()),
            timestamp: self.timestamp.filter(|t| !t.trim().is_empty()),
            url: self.url.filter(|u| !u.trim().is_empty()),
        })
    }
}

impl SourceList {
    pub fn into_vec(self) -> Vec<InsightSource> {
        match self {
            SourceList::One(s) => split_delimited(&s)
                .into_iter()
                .map(InsightSource::named)
                .collect(),
            SourceList::Single(obj) => source_item(obj).into_iter().collect(),
            SourceList::Many(items) => items.into_iter().filter_map(source_item).collect(),
        }
    }
}

/// Split a `;`-delimited string into trimmed, normalized, non-empty parts.
pub fn split_delimited(s: &str) -> Vec<String> {
    s.split(';')
        .map(normalize_text)
        .filter(|p| !p.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_list_accepts_all_three_shapes() {
        let one: TextList = serde_json::from_value(json!("survey X shows 40%")).unwrap();
        assert_eq!(one.into_vec(), vec!["survey X shows 40%".to_string()]);

        let delimited: TextList = serde_json::from_value(json!("a claim; another ; ")).unwrap();
        assert_eq!(
            delimited.into_vec(),
            vec!["a claim".to_string(), "another".to_string()]
        );

        let many: TextList =
            serde_json::from_value(json!(["first", {"quote": "second"}, ""])).unwrap();
        assert_eq!(
            many.into_vec(),
            vec!["first".to_string(), "second".to_string()]
        );
    }

    #[test]
    fn source_list_accepts_names_and_objects() {
        let list: SourceList = serde_json::from_value(json!([
            "Reddit",
            {"name": "Yelp", "quote": "Great &amp; fast", "url": "https://y.test/1"}
        ]))
        .unwrap();
        let v = list.into_vec();
        assert_eq!(v.len(), 2);
        assert_eq!(v[0].platform, "Reddit");
        assert_eq!(v[1].platform, "Yelp");
        assert_eq!(v[1].quote.as_deref(), Some("Great & fast"));
        assert_eq!(v[1].url.as_deref(), Some("https://y.test/1"));

        let delimited: SourceList = serde_json::from_value(json!("Reddit; Quora")).unwrap();
        assert_eq!(delimited.into_vec().len(), 2);
    }

    #[test]
    fn source_array_starting_with_names_keeps_every_entry() {
        let list: SourceList =
            serde_json::from_value(json!(["Yelp", "Google", {"platform": "Reddit"}])).unwrap();
        let v = list.into_vec();
        let platforms: Vec<_> = v.iter().map(|s| s.platform.as_str()).collect();
        assert_eq!(platforms, vec!["Yelp", "Google", "Reddit"]);
        assert!(v[0].quote.is_none());

        let single: SourceList =
            serde_json::from_value(json!({"site": "Quora", "link": "https://q.test"})).unwrap();
        assert_eq!(single.into_vec()[0].url.as_deref(), Some("https://q.test"));
    }

    #[test]
    fn malformed_list_elements_drop_only_themselves() {
        let raw = json!({
            "trend": "Heat pumps",
            "evidence": ["survey X shows 40%", null, ["nested"], {"quote": "installers agree"}],
            "sources": [{"platform": "Google Trends"}, {"url": "https://x.test"}, 7, "Reddit"]
        });
        let mut c = CommonFields::of(&raw);
        assert_eq!(
            c.take_evidence(),
            vec!["survey X shows 40%".to_string(), "installers agree".to_string()]
        );
        let platforms: Vec<_> = c.take_sources().into_iter().map(|s| s.platform).collect();
        assert_eq!(platforms, vec!["Google Trends".to_string(), "Reddit".to_string()]);
    }

    #[test]
    fn parse_errors_name_what_was_parsed() {
        let err = IntelligenceAggregate::from_json_str("{not json").unwrap_err();
        assert!(format!("{err:#}").contains("parsing intelligence aggregate"));
        let err = ValuePropositionContext::from_json_str("[").unwrap_err();
        assert!(format!("{err:#}").contains("parsing value-proposition context"));
    }

    #[test]
    fn scores_normalize_into_unit_range() {
        assert_eq!(Score::Number(0.4).to_confidence(), Some(0.4));
        assert_eq!(Score::Number(85.0).to_confidence(), Some(0.85));
        assert_eq!(Score::Number(-3.0).to_confidence(), Some(0.0));
        assert_eq!(Score::Text("72%".into()).to_confidence(), Some(0.72));
        assert_eq!(Score::Text("High".into()).to_confidence(), Some(0.85));
        assert_eq!(Score::Text("n/a".into()).to_confidence(), None);
    }

    #[test]
    fn wrong_typed_optional_field_is_dropped_not_fatal() {
        let raw = json!({"trend": "x", "confidence": {"nested": true}, "evidence": 12});
        let c = CommonFields::of(&raw);
        assert!(c.confidence().is_none());
        // a bare number is neither a string nor an array
        assert!(c.evidence.is_none());
    }

    #[test]
    fn aggregate_tolerates_bad_sections() {
        let agg = IntelligenceAggregate::from_json_str(
            r#"{"trends": "oops", "synthesis": 5, "dataPoints": [{"kind": "review", "content": "ok"}]}"#,
        )
        .unwrap();
        assert!(agg.trends.is_empty());
        assert!(agg.synthesis.key_insights.is_empty());
        assert_eq!(agg.raw_data_points.len(), 1);
        assert_eq!(agg.record_count(), 1);
    }
}

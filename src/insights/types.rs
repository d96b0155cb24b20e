// src/insights/types.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical five-way insight category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Psychological hooks: pains, fears, desires, objections.
    Triggers,
    /// Credibility signals: testimonials, ratings, statistics.
    Proof,
    /// Time-relevant topics: trends, news, events, seasonal moments.
    Trends,
    /// Voice-of-customer text: quotes, questions, discussions.
    Conversations,
    /// Opportunity and competitive spaces.
    Gaps,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Triggers,
        Category::Proof,
        Category::Trends,
        Category::Conversations,
        Category::Gaps,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Triggers => "triggers",
            Category::Proof => "proof",
            Category::Trends => "trends",
            Category::Conversations => "conversations",
            Category::Gaps => "gaps",
        }
    }
}

/// Aggregate section an insight was extracted from. Declaration order is the
/// order the scheduler runs the extractors in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Trends,
    UnmetNeeds,
    EmotionalTriggers,
    CompetitiveBlindSpots,
    MarketGaps,
    LocalEvents,
    CulturalMoments,
    KeyInsights,
    HiddenPatterns,
    RawDataPoints,
    CorrelatedInsights,
    Breakthroughs,
    ValueProposition,
}

impl Section {
    pub const ORDER: [Section; 13] = [
        Section::Trends,
        Section::UnmetNeeds,
        Section::EmotionalTriggers,
        Section::CompetitiveBlindSpots,
        Section::MarketGaps,
        Section::LocalEvents,
        Section::CulturalMoments,
        Section::KeyInsights,
        Section::HiddenPatterns,
        Section::RawDataPoints,
        Section::CorrelatedInsights,
        Section::Breakthroughs,
        Section::ValueProposition,
    ];

    /// Label handed to progress reporters and used in metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Section::Trends => "trends",
            Section::UnmetNeeds => "unmet_needs",
            Section::EmotionalTriggers => "emotional_triggers",
            Section::CompetitiveBlindSpots => "competitive_blind_spots",
            Section::MarketGaps => "market_gaps",
            Section::LocalEvents => "local_events",
            Section::CulturalMoments => "cultural_moments",
            Section::KeyInsights => "key_insights",
            Section::HiddenPatterns => "hidden_patterns",
            Section::RawDataPoints => "raw_data_points",
            Section::CorrelatedInsights => "correlated_insights",
            Section::Breakthroughs => "breakthroughs",
            Section::ValueProposition => "value_proposition",
        }
    }

    /// Short prefix for derived ids (`trend-0`, `gap-3`, ...).
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Section::Trends => "trend",
            Section::UnmetNeeds => "need",
            Section::EmotionalTriggers => "trigger",
            Section::CompetitiveBlindSpots => "blindspot",
            Section::MarketGaps => "gap",
            Section::LocalEvents => "event",
            Section::CulturalMoments => "moment",
            Section::KeyInsights => "synthesis",
            Section::HiddenPatterns => "pattern",
            Section::RawDataPoints => "dp",
            Section::CorrelatedInsights => "correlated",
            Section::Breakthroughs => "breakthrough",
            Section::ValueProposition => "uvp",
        }
    }
}

/// Where a piece of evidence was observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightSource {
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl InsightSource {
    pub fn named<S: Into<String>>(platform: S) -> Self {
        Self {
            platform: platform.into(),
            quote: None,
            timestamp: None,
            url: None,
        }
    }
}

/// One normalized, categorized record derived from the aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub id: String,
    pub category: Category,
    pub section: Section,
    pub title: String,
    pub description: String,
    pub confidence: f32,
    pub is_time_sensitive: bool,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub sources: Vec<InsightSource>,
    /// The originating sub-record, kept verbatim for provenance display.
    pub raw_payload: Value,
}

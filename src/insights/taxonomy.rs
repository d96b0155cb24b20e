//! Category taxonomy: the single translation boundary from source-reported
//! `kind` tags to the canonical five-way [`Category`].
//!
//! - Tags are normalized first (trim, lowercase, `-`/space → `_`).
//! - Both vocabularies are covered: the current one (triggers/proof/trends/
//!   conversations/gaps plus their source kinds) and the legacy one
//!   (customer/market/competition/local/opportunity).
//! - Unknown or empty tags fall back to [`DEFAULT_CATEGORY`]. The lookup never fails.

use super::types::Category;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Category for tags the table does not know. Most untagged scrape output is
/// customer text, so it lands with the conversations.
pub const DEFAULT_CATEGORY: Category = Category::Conversations;

const TABLE: &[(&str, Category)] = &[
    // --- canonical names ---
    ("triggers", Category::Triggers),
    ("trigger", Category::Triggers),
    ("proof", Category::Proof),
    ("trends", Category::Trends),
    ("trend", Category::Trends),
    ("conversations", Category::Conversations),
    ("conversation", Category::Conversations),
    ("gaps", Category::Gaps),
    ("gap", Category::Gaps),
    // --- legacy five-way set ---
    ("customer", Category::Conversations),
    ("market", Category::Trends),
    ("competition", Category::Gaps),
    ("local", Category::Trends),
    ("opportunity", Category::Gaps),
    // --- psychological hooks ---
    ("pain_point", Category::Triggers),
    ("pain", Category::Triggers),
    ("fear", Category::Triggers),
    ("desire", Category::Triggers),
    ("objection", Category::Triggers),
    ("frustration", Category::Triggers),
    ("motivation", Category::Triggers),
    ("aspiration", Category::Triggers),
    ("emotional_trigger", Category::Triggers),
    ("emotion", Category::Triggers),
    ("psychological", Category::Triggers),
    ("buying_trigger", Category::Triggers),
    ("unarticulated_need", Category::Triggers),
    ("hidden_desire", Category::Triggers),
    // --- credibility signals ---
    ("testimonial", Category::Proof),
    ("review", Category::Proof),
    ("rating", Category::Proof),
    ("case_study", Category::Proof),
    ("statistic", Category::Proof),
    ("stat", Category::Proof),
    ("proof_point", Category::Proof),
    ("social_proof", Category::Proof),
    ("credential", Category::Proof),
    ("award", Category::Proof),
    ("certification", Category::Proof),
    ("validation", Category::Proof),
    ("correlated", Category::Proof),
    // --- time-relevant topics ---
    ("trending_topic", Category::Trends),
    ("search_trend", Category::Trends),
    ("market_trend", Category::Trends),
    ("industry_trend", Category::Trends),
    ("news", Category::Trends),
    ("seasonal", Category::Trends),
    ("local_event", Category::Trends),
    ("event", Category::Trends),
    ("cultural_moment", Category::Trends),
    ("weather", Category::Trends),
    ("timing", Category::Trends),
    // --- voice of customer ---
    ("customer_quote", Category::Conversations),
    ("quote", Category::Conversations),
    ("question", Category::Conversations),
    ("discussion", Category::Conversations),
    ("forum_post", Category::Conversations),
    ("reddit_post", Category::Conversations),
    ("comment", Category::Conversations),
    ("feedback", Category::Conversations),
    ("complaint", Category::Conversations),
    ("community", Category::Conversations),
    ("social_post", Category::Conversations),
    // --- opportunity / competitive space ---
    ("market_gap", Category::Gaps),
    ("content_gap", Category::Gaps),
    ("competitive_gap", Category::Gaps),
    ("competitor_gap", Category::Gaps),
    ("competitor_weakness", Category::Gaps),
    ("competitive_blind_spot", Category::Gaps),
    ("blind_spot", Category::Gaps),
    ("unmet_need", Category::Gaps),
    ("whitespace", Category::Gaps),
    ("differentiator", Category::Gaps),
    ("breakthrough", Category::Gaps),
    ("hidden_pattern", Category::Gaps),
    ("competitor", Category::Gaps),
];

static LOOKUP: Lazy<HashMap<&'static str, Category>> =
    Lazy::new(|| TABLE.iter().copied().collect());

/// Normalize a raw tag into the table's key form.
pub fn normalize_kind(raw: &str) -> String {
    raw.trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c == '-' || c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Map a source-reported kind to its canonical category.
pub fn classify(raw_kind: &str) -> Category {
    lookup(raw_kind).unwrap_or(DEFAULT_CATEGORY)
}

/// Like [`classify`], but reports unknown tags as `None` so callers can apply
/// their own section default.
pub fn lookup(raw_kind: &str) -> Option<Category> {
    let key = normalize_kind(raw_kind);
    if let Some(c) = LOOKUP.get(key.as_str()) {
        return Some(*c);
    }
    // Plural tags ("testimonials", "pain_points") resolve through their singular.
    key.strip_suffix('s')
        .and_then(|singular| LOOKUP.get(singular).copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_separators() {
        assert_eq!(classify("Pain-Point"), Category::Triggers);
        assert_eq!(classify("  customer quote "), Category::Conversations);
        assert_eq!(classify("CASE_STUDY"), Category::Proof);
    }

    #[test]
    fn legacy_set_maps_onto_canonical() {
        assert_eq!(classify("customer"), Category::Conversations);
        assert_eq!(classify("market"), Category::Trends);
        assert_eq!(classify("competition"), Category::Gaps);
        assert_eq!(classify("local"), Category::Trends);
        assert_eq!(classify("opportunity"), Category::Gaps);
    }

    #[test]
    fn plurals_resolve_through_singular() {
        assert_eq!(classify("testimonials"), Category::Proof);
        assert_eq!(classify("pain_points"), Category::Triggers);
    }

    #[test]
    fn unknown_and_empty_fall_back_to_default() {
        assert_eq!(classify(""), DEFAULT_CATEGORY);
        assert_eq!(classify("zzz-not-a-kind"), DEFAULT_CATEGORY);
        assert_eq!(lookup("zzz-not-a-kind"), None);
    }
}

// src/insights/extractors/value_prop.rs
//! Fixed records derived from the value-proposition context. These are the
//! only insights that exist without any aggregate, which makes this extractor
//! the fallback when a full extraction fails.

use super::{assemble, note_emitted, Parts};
use crate::insights::aggregate::{CommonFields, ValuePropositionContext};
use crate::insights::types::{Category, Insight, Section};
use serde_json::json;

/// Emits, in order: target customer, transformation, key benefit, unique
/// solution, then one record per proof point. Blank fields produce nothing.
pub fn extract_value_proposition(ctx: Option<&ValuePropositionContext>) -> Vec<Insight> {
    let Some(ctx) = ctx else {
        return Vec::new();
    };

    let mut slots: Vec<(&'static str, Category, String)> = Vec::new();
    if let Some(c) = &ctx.target_customer {
        slots.push(("customer", Category::Conversations, c.clone()));
    }
    if let Some(t) = &ctx.transformation {
        slots.push(("transformation", Category::Triggers, t.to_text()));
    }
    if let Some(b) = &ctx.key_benefit {
        slots.push(("benefit", Category::Proof, b.clone()));
    }
    if let Some(s) = &ctx.unique_solution {
        slots.push(("solution", Category::Gaps, s.clone()));
    }
    let proofs = ctx
        .proof_points
        .clone()
        .map(|p| p.into_vec())
        .unwrap_or_default();

    let mut out = Vec::with_capacity(slots.len() + proofs.len());
    for (slot, category, text) in slots {
        let raw = json!({ "slot": slot, "text": text });
        if let Some(mut insight) = assemble(
            Section::ValueProposition,
            out.len(),
            &raw,
            CommonFields::default(),
            Parts {
                headline: text,
                category: Some(category),
                ..Parts::default()
            },
        ) {
            insight.id = format!("{}-{}", Section::ValueProposition.id_prefix(), slot);
            out.push(insight);
        }
    }
    for (i, proof) in proofs.into_iter().enumerate() {
        let raw = json!({ "slot": "proof", "text": proof });
        if let Some(mut insight) = assemble(
            Section::ValueProposition,
            i,
            &raw,
            CommonFields::default(),
            Parts {
                headline: proof,
                category: Some(Category::Proof),
                ..Parts::default()
            },
        ) {
            insight.id = format!("{}-proof-{}", Section::ValueProposition.id_prefix(), i);
            out.push(insight);
        }
    }
    note_emitted(Section::ValueProposition, out.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_context_no_records() {
        assert!(extract_value_proposition(None).is_empty());
    }

    #[test]
    fn fixed_slots_in_order() {
        let ctx = ValuePropositionContext::from_json_str(
            r#"{
                "targetCustomer": "Busy homeowners in older houses",
                "transformation": {"before": "surprise repair bills", "after": "predictable upkeep"},
                "keyBenefit": "Same-week service with upfront pricing",
                "uniqueSolution": "Subscription maintenance with priority dispatch",
                "proofPoints": "4.9 stars on 1,200 reviews; Licensed since 1998"
            }"#,
        )
        .unwrap();
        let out = extract_value_proposition(Some(&ctx));
        let ids: Vec<_> = out.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "uvp-customer",
                "uvp-transformation",
                "uvp-benefit",
                "uvp-solution",
                "uvp-proof-0",
                "uvp-proof-1"
            ]
        );
        assert_eq!(out[1].category, Category::Triggers);
        assert_eq!(out[1].description, "From surprise repair bills to predictable upkeep");
        assert!(out.iter().all(|i| (i.confidence - 0.90).abs() < 1e-6));
        assert!(out.iter().all(|i| !i.is_time_sensitive));
    }
}

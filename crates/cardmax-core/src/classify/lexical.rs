//! Tier-1 lexical classifier
//!
//! Scores every category by merchant-pattern and keyword hits, each
//! modulated by match position, nearby action verbs, and adjacency
//! modifiers. Cheap enough to run on every request; high-confidence
//! wins short-circuit the rest of the cascade.

use crate::models::{ClassificationResult, ClassificationSource};
use crate::taxonomy::Taxonomy;

/// Fixed weight for a merchant-pattern hit, well above any keyword
const MERCHANT_WEIGHT: f64 = 10.0;

/// Multiplier for hits marked as incidental background
const SUPPRESS_FACTOR: f64 = 0.2;

/// Multiplier for hits marked as the true purchase context
const CONTEXT_FACTOR: f64 = 1.15;

/// Multiplier for hits tied to the purchase by a preposition
const BOOST_FACTOR: f64 = 1.2;

#[derive(Debug, Default, Clone)]
struct CategoryScore {
    score: f64,
    merchant_hit: bool,
    keyword_hits: usize,
}

/// Score a description against every category and derive a confidence
/// from the winner's margin over the runner-up.
pub(crate) fn classify(taxonomy: &Taxonomy, description: &str) -> ClassificationResult {
    let text = description.trim().to_lowercase();
    if text.is_empty() {
        return ClassificationResult::fallback("empty or non-text description");
    }

    let verbs: Vec<&str> = text
        .split_whitespace()
        .filter(|w| taxonomy.is_action_verb(w))
        .collect();

    let mut scores: Vec<(usize, CategoryScore)> = Vec::new();

    for (idx, entry) in taxonomy.entries().iter().enumerate() {
        let mut cs = CategoryScore::default();

        if let Some(m) = entry.merchant.find(&text) {
            cs.score += MERCHANT_WEIGHT
                * position_factor(m.start(), text.len())
                * adjacency_factor(taxonomy, &text, m.start(), m.end());
            cs.merchant_hit = true;
        }

        for kw in &entry.keywords {
            if let Some((start, end)) = find_word(&text, &kw.phrase) {
                cs.score += kw.weight
                    * position_factor(start, text.len())
                    * adjacency_factor(taxonomy, &text, start, end);
                cs.keyword_hits += 1;
            }
        }

        // Action verbs modulate the whole category: aligned verbs boost,
        // any other verb presence mildly discounts competing categories.
        if !verbs.is_empty() && cs.score > 0.0 {
            let aligned = verbs
                .iter()
                .any(|v| taxonomy.aligned_verb_category(v) == Some(entry.name.as_str()));
            cs.score *= if aligned { 1.25 } else { 0.9 };
        }

        if cs.score > 0.0 {
            scores.push((idx, cs));
        }
    }

    if scores.is_empty() {
        return ClassificationResult::fallback("no lexical signals in description");
    }

    scores.sort_by(|a, b| b.1.score.partial_cmp(&a.1.score).unwrap_or(std::cmp::Ordering::Equal));

    let (winner_idx, winner) = (scores[0].0, scores[0].1.clone());
    let runner_up = scores.get(1).map(|(_, s)| s.score).unwrap_or(0.0);
    let margin = if winner.score > 0.0 {
        (winner.score - runner_up) / winner.score
    } else {
        0.0
    };

    // Margin carries most of the signal; independent evidence types add a
    // bonus, and every additional scoring category costs a little.
    let mut confidence = 0.5 + 0.35 * margin;
    if winner.merchant_hit && winner.keyword_hits > 0 {
        confidence += 0.15;
    }
    confidence -= 0.05 * (scores.len() as f64 - 1.0);
    let confidence = confidence.clamp(0.1, 0.9);

    let category = taxonomy.entries()[winner_idx].name.clone();
    let source = if winner.merchant_hit {
        ClassificationSource::Merchant
    } else {
        ClassificationSource::Keyword
    };
    let reasoning = format!(
        "{}{} hit(s) for {}; margin {:.2} over runner-up",
        if winner.merchant_hit { "merchant pattern + " } else { "" },
        winner.keyword_hits,
        category,
        margin,
    );

    ClassificationResult {
        category,
        confidence,
        source,
        reasoning,
    }
}

/// Earlier matches score higher: 1.2 at the start down to 0.8 at the end
fn position_factor(start: usize, len: usize) -> f64 {
    1.2 - 0.4 * (start as f64 / len.max(1) as f64)
}

/// Modifier derived from the words adjacent to a match.
///
/// A suppressor before the hit ("listening to spotify") or right after it
/// ("spotify during commute") marks the hit as background. "during" before
/// a hit marks it as the true context, and plain prepositions ("at",
/// "from", "for") tie the purchase to the hit.
fn adjacency_factor(taxonomy: &Taxonomy, text: &str, start: usize, end: usize) -> f64 {
    let before: Vec<&str> = text[..start].split_whitespace().collect();
    let last = before.last().copied();
    let last_two = if before.len() >= 2 {
        Some(format!("{} {}", before[before.len() - 2], before[before.len() - 1]))
    } else {
        None
    };

    let suppressed_before = taxonomy.suppressors_before().iter().any(|s| {
        last == Some(*s) || last_two.as_deref() == Some(*s)
    });

    let after = text[end..].split_whitespace().next();
    let suppressed_after = after
        .map(|w| taxonomy.suppressors_after().contains(&w))
        .unwrap_or(false);

    if suppressed_before || suppressed_after {
        return SUPPRESS_FACTOR;
    }
    if let Some(w) = last {
        if taxonomy.context_before().contains(&w) {
            return CONTEXT_FACTOR;
        }
        if taxonomy.boosters_before().contains(&w) {
            return BOOST_FACTOR;
        }
    }
    1.0
}

/// Find a phrase as a whole-word substring: the characters on both sides
/// of the match must not be alphanumeric.
fn find_word(text: &str, phrase: &str) -> Option<(usize, usize)> {
    for (start, _) in text.match_indices(phrase) {
        let end = start + phrase.len();
        let ok_before = start == 0
            || !text[..start].chars().next_back().map_or(false, |c| c.is_alphanumeric());
        let ok_after = end == text.len()
            || !text[end..].chars().next().map_or(false, |c| c.is_alphanumeric());
        if ok_before && ok_after {
            return Some((start, end));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::OTHER;

    fn taxonomy() -> Taxonomy {
        Taxonomy::new().unwrap()
    }

    #[test]
    fn test_merchant_plus_keyword_is_high_confidence() {
        let t = taxonomy();
        let result = classify(&t, "weekly groceries at Whole Foods");
        assert_eq!(result.category, "Grocery");
        assert!(result.confidence >= 0.85, "confidence {}", result.confidence);
        assert_eq!(result.source, ClassificationSource::Merchant);
    }

    #[test]
    fn test_background_merchant_loses_to_context_keyword() {
        let t = taxonomy();
        let result = classify(&t, "listening to spotify during commute");
        assert_eq!(result.category, "Transit");
        assert_eq!(result.source, ClassificationSource::Keyword);
    }

    #[test]
    fn test_empty_input_degrades() {
        let t = taxonomy();
        let result = classify(&t, "   ");
        assert_eq!(result.category, OTHER);
        assert!(result.confidence <= 0.2);
        assert_eq!(result.source, ClassificationSource::Fallback);
    }

    #[test]
    fn test_no_signal_degrades() {
        let t = taxonomy();
        let result = classify(&t, "qwertyuiop zxcvbnm");
        assert_eq!(result.category, OTHER);
        assert!(result.confidence <= 0.2);
    }

    #[test]
    fn test_action_verb_boosts_aligned_category() {
        let t = taxonomy();
        let plain = classify(&t, "a hotel in denver");
        let boosted = classify(&t, "booking a hotel in denver");
        assert_eq!(boosted.category, "Travel");
        assert!(boosted.confidence >= plain.confidence);
    }

    #[test]
    fn test_earlier_match_scores_higher() {
        assert!(position_factor(0, 30) > position_factor(25, 30));
    }

    #[test]
    fn test_find_word_respects_boundaries() {
        assert!(find_word("cheap gas nearby", "gas").is_some());
        assert!(find_word("gasoline futures", "gas").is_none());
    }

    #[test]
    fn test_keyword_only_source_is_keyword() {
        let t = taxonomy();
        let result = classify(&t, "dinner with friends");
        assert_eq!(result.category, "Dining");
        assert_eq!(result.source, ClassificationSource::Keyword);
    }
}

//! Recommendation ranking
//!
//! Orders a set of cards by computed reward value for a purchase.
//! Primary sort is total currency value (effective rate when the amount
//! is absent or zero), tie-broken by effective rate descending. The
//! simplicity score is computed for display only and is never a sort
//! key.

use chrono::NaiveDate;
use std::cmp::Ordering;

use crate::catalog::CatalogEntry;
use crate::models::{RankedCard, RewardBreakdown};
use crate::rewards::RewardCalculator;

pub struct RecommendationRanker<'a> {
    calculator: &'a RewardCalculator<'a>,
}

impl<'a> RecommendationRanker<'a> {
    pub fn new(calculator: &'a RewardCalculator<'a>) -> Self {
        Self { calculator }
    }

    pub fn rank(
        &self,
        entries: &[CatalogEntry],
        category: &str,
        amount: f64,
        date: NaiveDate,
        user_id: Option<&str>,
    ) -> Vec<RankedCard> {
        let mut ranked: Vec<RankedCard> = entries
            .iter()
            .map(|entry| {
                let result = self.calculator.compute_reward(
                    &entry.card,
                    &entry.rewards,
                    category,
                    amount,
                    date,
                    user_id,
                );
                let simplicity = simplicity_score(&result);
                RankedCard {
                    card: entry.card.clone(),
                    result,
                    simplicity,
                }
            })
            .collect();

        ranked.sort_by(|a, b| {
            let primary = if amount > 0.0 {
                b.result
                    .reward_value
                    .partial_cmp(&a.result.reward_value)
                    .unwrap_or(Ordering::Equal)
            } else {
                b.result
                    .effective_rate
                    .partial_cmp(&a.result.effective_rate)
                    .unwrap_or(Ordering::Equal)
            };
            primary.then_with(|| {
                b.result
                    .effective_rate
                    .partial_cmp(&a.result.effective_rate)
                    .unwrap_or(Ordering::Equal)
            })
        });
        ranked
    }
}

/// Ease-of-use score for display: portal hoops, caps, and activation
/// requirements each knock points off a 100 baseline.
fn simplicity_score(result: &RewardBreakdown) -> i32 {
    let mut score = 100;
    if result.portal_only {
        score -= 30;
    }
    if result.cap_status.is_some() {
        score -= 20;
    }
    let activation_required = result
        .notes
        .as_deref()
        .map(|n| n.to_lowercase().contains("activation required"))
        .unwrap_or(false);
    if activation_required {
        score -= 25;
    }
    score
}

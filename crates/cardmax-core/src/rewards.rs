//! Reward calculation
//!
//! Determines the effective reward rate for a card/category/amount/date
//! and the resulting currency value. Caps are resolved against the
//! spending ledger; a transaction that spans its cap boundary earns a
//! rate blended linearly between the full multiplier and the card's
//! base rate. Internal failures degrade to the base reward — reward
//! computation must never block a recommendation.

use chrono::NaiveDate;
use tracing::warn;

use crate::caps::SpendingCapTracker;
use crate::ledger::SpendingLedger;
use crate::models::{CapStatus, Card, Reward, RewardBreakdown};
use crate::taxonomy::{Taxonomy, WILDCARD};

/// Base rate assumed when a card carries no wildcard reward
const DEFAULT_BASE_RATE: f64 = 1.0;

/// Whether a reward applies to a target category on a date: category
/// match (direct, wildcard, or synonyms) plus validity window.
pub fn reward_applies(taxonomy: &Taxonomy, reward: &Reward, category: &str, date: NaiveDate) -> bool {
    reward.valid_on(date) && taxonomy.matches(&reward.category, category)
}

pub struct RewardCalculator<'a> {
    taxonomy: &'a Taxonomy,
    ledger: Option<&'a dyn SpendingLedger>,
}

impl<'a> RewardCalculator<'a> {
    /// Calculator without ledger access: capped rewards are treated
    /// optimistically (full multiplier).
    pub fn new(taxonomy: &'a Taxonomy) -> Self {
        Self {
            taxonomy,
            ledger: None,
        }
    }

    pub fn with_ledger(taxonomy: &'a Taxonomy, ledger: &'a dyn SpendingLedger) -> Self {
        Self {
            taxonomy,
            ledger: Some(ledger),
        }
    }

    /// Compute the best reward a card offers for a purchase.
    ///
    /// Picks the applicable reward with the highest effective rate
    /// (ties go to the first seen); falls back to the base reward
    /// (multiplier 1.0, no cap) when nothing applies.
    pub fn compute_reward(
        &self,
        card: &Card,
        rewards: &[Reward],
        category: &str,
        amount: f64,
        date: NaiveDate,
        user_id: Option<&str>,
    ) -> RewardBreakdown {
        let base_rate = self.base_rate(rewards, date);

        let mut best: Option<RewardBreakdown> = None;
        for reward in rewards {
            if !reward_applies(self.taxonomy, reward, category, date) {
                continue;
            }
            let (effective_rate, cap_status) =
                self.effective_rate(card, reward, amount, date, user_id, base_rate);
            let candidate = RewardBreakdown {
                category: reward.category.clone(),
                multiplier: reward.multiplier,
                effective_rate,
                reward_value: reward_value(amount, effective_rate),
                portal_only: reward.portal_only,
                cap_status,
                notes: reward.notes.clone(),
            };
            let beats = best
                .as_ref()
                .map_or(true, |b| candidate.effective_rate > b.effective_rate);
            if beats {
                best = Some(candidate);
            }
        }

        best.unwrap_or_else(|| base_breakdown(category, amount))
    }

    /// Card's base rate: its valid wildcard reward, else 1.0
    fn base_rate(&self, rewards: &[Reward], date: NaiveDate) -> f64 {
        rewards
            .iter()
            .find(|r| r.category.eq_ignore_ascii_case(WILDCARD) && r.valid_on(date))
            .map(|r| r.multiplier)
            .unwrap_or(DEFAULT_BASE_RATE)
    }

    /// Effective rate for one reward, with cap handling:
    /// - no cap: full multiplier
    /// - cap without user context: full multiplier (optimistic)
    /// - cap exhausted: base rate
    /// - transaction inside remaining cap: full multiplier
    /// - transaction spanning the boundary: linear blend
    fn effective_rate(
        &self,
        card: &Card,
        reward: &Reward,
        amount: f64,
        date: NaiveDate,
        user_id: Option<&str>,
        base_rate: f64,
    ) -> (f64, Option<CapStatus>) {
        let Some(cap) = reward.cap else {
            return (reward.multiplier, None);
        };

        let Some(ledger) = self.ledger else {
            return (reward.multiplier, Some(CapStatus::new(cap, 0.0)));
        };
        if user_id.is_none() {
            return (reward.multiplier, Some(CapStatus::new(cap, 0.0)));
        }

        let tracker = SpendingCapTracker::new(ledger, self.taxonomy);
        let used = tracker.spend_in_period(reward, user_id, date);
        let status = CapStatus::new(cap, used);
        let remaining = status.remaining;

        let rate = if remaining <= 0.0 {
            warn!(
                card = %card.id,
                category = %reward.category,
                "Spending cap exhausted, earning base rate"
            );
            base_rate
        } else if amount <= remaining {
            reward.multiplier
        } else {
            let inside = remaining / amount;
            reward.multiplier * inside + base_rate * (1.0 - inside)
        };

        (rate, Some(status))
    }
}

/// amount * rate / 100, fixed to 2 decimals; 0 for absent/zero amounts
fn reward_value(amount: f64, rate: f64) -> f64 {
    if amount <= 0.0 {
        return 0.0;
    }
    (amount * rate / 100.0 * 100.0).round() / 100.0
}

fn base_breakdown(category: &str, amount: f64) -> RewardBreakdown {
    RewardBreakdown {
        category: category.to_string(),
        multiplier: DEFAULT_BASE_RATE,
        effective_rate: DEFAULT_BASE_RATE,
        reward_value: reward_value(amount, DEFAULT_BASE_RATE),
        portal_only: false,
        cap_status: None,
        notes: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_fixtures::{card, reward};
    use crate::ledger::{FailingLedger, MemoryLedger};
    use crate::models::NewSpendingRecord;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn capped_grocery_reward(cap: f64, notes: &str) -> Reward {
        Reward {
            cap: Some(cap),
            notes: Some(notes.into()),
            ..reward("c1", "Grocery", 6.0)
        }
    }

    fn seed_spend(ledger: &MemoryLedger, amount: f64) {
        ledger
            .insert_spending(&NewSpendingRecord {
                user_id: "u1".into(),
                card_id: "c1".into(),
                category: "Grocery".into(),
                amount,
                date: date(2025, 2, 1),
            })
            .unwrap();
    }

    #[test]
    fn test_uncapped_rate_is_constant_in_amount() {
        let taxonomy = Taxonomy::new().unwrap();
        let calc = RewardCalculator::new(&taxonomy);
        let c = card("c1", "Card", 0.0);
        let rewards = vec![reward("c1", "Dining", 3.0)];
        for amount in [0.0, 10.0, 5000.0] {
            let result = calc.compute_reward(&c, &rewards, "Dining", amount, date(2025, 6, 1), None);
            assert_eq!(result.effective_rate, 3.0);
        }
    }

    #[test]
    fn test_blended_rate_across_cap_boundary() {
        // cap 6000/yr, prior spend 5900, amount 200:
        // remaining = 100, blend = 6 * 0.5 + 1 * 0.5 = 3.5
        let taxonomy = Taxonomy::new().unwrap();
        let ledger = MemoryLedger::new();
        seed_spend(&ledger, 5900.0);
        let calc = RewardCalculator::with_ledger(&taxonomy, &ledger);
        let c = card("c1", "Card", 0.0);
        let rewards = vec![capped_grocery_reward(6000.0, "yearly cap")];

        let result =
            calc.compute_reward(&c, &rewards, "Grocery", 200.0, date(2025, 6, 1), Some("u1"));
        assert!((result.effective_rate - 3.5).abs() < 1e-9);
        let status = result.cap_status.unwrap();
        assert_eq!(status.remaining, 100.0);
        assert_eq!(status.used, 5900.0);
    }

    #[test]
    fn test_effective_rate_non_increasing_in_cumulative_spend() {
        let taxonomy = Taxonomy::new().unwrap();
        let c = card("c1", "Card", 0.0);
        let rewards = vec![capped_grocery_reward(6000.0, "yearly cap")];
        let at = date(2025, 6, 1);

        let mut rates = Vec::new();
        for spend in [0.0, 3000.0, 5900.0, 5999.0, 6000.0, 7000.0] {
            let ledger = MemoryLedger::new();
            if spend > 0.0 {
                seed_spend(&ledger, spend);
            }
            let calc = RewardCalculator::with_ledger(&taxonomy, &ledger);
            let result = calc.compute_reward(&c, &rewards, "Grocery", 200.0, at, Some("u1"));
            rates.push(result.effective_rate);
        }

        for pair in rates.windows(2) {
            assert!(pair[1] <= pair[0], "rate rose as spend grew: {:?}", rates);
        }
        assert_eq!(rates[0], 6.0);
        // At and past the cap only the base rate remains
        assert_eq!(*rates.last().unwrap(), 1.0);
    }

    #[test]
    fn test_exhausted_cap_earns_base_rate() {
        let taxonomy = Taxonomy::new().unwrap();
        let ledger = MemoryLedger::new();
        seed_spend(&ledger, 6000.0);
        let calc = RewardCalculator::with_ledger(&taxonomy, &ledger);
        let c = card("c1", "Card", 0.0);
        let rewards = vec![
            capped_grocery_reward(6000.0, "yearly cap"),
            reward("c1", "All", 1.5),
        ];

        let result =
            calc.compute_reward(&c, &rewards, "Grocery", 100.0, date(2025, 6, 1), Some("u1"));
        // Base rate comes from the card's wildcard reward, and the
        // wildcard itself (1.5) now beats the exhausted 6x reward
        assert_eq!(result.effective_rate, 1.5);
    }

    #[test]
    fn test_rate_is_continuous_at_cap_boundary() {
        let taxonomy = Taxonomy::new().unwrap();
        let ledger = MemoryLedger::new();
        seed_spend(&ledger, 5900.0);
        let calc = RewardCalculator::with_ledger(&taxonomy, &ledger);
        let c = card("c1", "Card", 0.0);
        let rewards = vec![capped_grocery_reward(6000.0, "yearly cap")];
        let at = date(2025, 6, 1);

        // Just inside the remaining cap: full multiplier
        let inside = calc.compute_reward(&c, &rewards, "Grocery", 100.0, at, Some("u1"));
        assert_eq!(inside.effective_rate, 6.0);
        // Just past it: strictly between base and multiplier, near 6
        let past = calc.compute_reward(&c, &rewards, "Grocery", 100.01, at, Some("u1"));
        assert!(past.effective_rate < 6.0 && past.effective_rate > 5.99);
    }

    #[test]
    fn test_cap_without_user_context_is_optimistic() {
        let taxonomy = Taxonomy::new().unwrap();
        let ledger = MemoryLedger::new();
        seed_spend(&ledger, 6000.0);
        let calc = RewardCalculator::with_ledger(&taxonomy, &ledger);
        let c = card("c1", "Card", 0.0);
        let rewards = vec![capped_grocery_reward(6000.0, "yearly cap")];

        let result = calc.compute_reward(&c, &rewards, "Grocery", 100.0, date(2025, 6, 1), None);
        assert_eq!(result.effective_rate, 6.0);
    }

    #[test]
    fn test_ledger_failure_degrades_not_errors() {
        let taxonomy = Taxonomy::new().unwrap();
        let ledger = FailingLedger;
        let calc = RewardCalculator::with_ledger(&taxonomy, &ledger);
        let c = card("c1", "Card", 0.0);
        let rewards = vec![capped_grocery_reward(6000.0, "yearly cap")];

        // Failed cap lookup reads as zero prior spend
        let result =
            calc.compute_reward(&c, &rewards, "Grocery", 100.0, date(2025, 6, 1), Some("u1"));
        assert_eq!(result.effective_rate, 6.0);
    }

    #[test]
    fn test_nothing_applicable_returns_base_reward() {
        let taxonomy = Taxonomy::new().unwrap();
        let calc = RewardCalculator::new(&taxonomy);
        let c = card("c1", "Card", 0.0);
        let rewards = vec![reward("c1", "Travel", 5.0)];

        let result = calc.compute_reward(&c, &rewards, "Dining", 80.0, date(2025, 6, 1), None);
        assert_eq!(result.effective_rate, 1.0);
        assert_eq!(result.reward_value, 0.8);
        assert!(result.cap_status.is_none());
    }

    #[test]
    fn test_expired_reward_does_not_apply() {
        let taxonomy = Taxonomy::new().unwrap();
        let calc = RewardCalculator::new(&taxonomy);
        let c = card("c1", "Card", 0.0);
        let rewards = vec![Reward {
            end_date: date(2024, 12, 31).into(),
            ..reward("c1", "Dining", 4.0)
        }];

        let result = calc.compute_reward(&c, &rewards, "Dining", 80.0, date(2025, 6, 1), None);
        assert_eq!(result.effective_rate, 1.0);
    }

    #[test]
    fn test_synonym_category_applies() {
        let taxonomy = Taxonomy::new().unwrap();
        let calc = RewardCalculator::new(&taxonomy);
        let c = card("c1", "Card", 0.0);
        let rewards = vec![reward("c1", "restaurants", 4.0)];

        let result = calc.compute_reward(&c, &rewards, "Dining", 100.0, date(2025, 6, 1), None);
        assert_eq!(result.effective_rate, 4.0);
    }

    #[test]
    fn test_ties_keep_first_seen_reward() {
        let taxonomy = Taxonomy::new().unwrap();
        let calc = RewardCalculator::new(&taxonomy);
        let c = card("c1", "Card", 0.0);
        let first = Reward {
            notes: Some("first".into()),
            ..reward("c1", "Dining", 3.0)
        };
        let second = Reward {
            notes: Some("second".into()),
            ..reward("c1", "restaurants", 3.0)
        };

        let result =
            calc.compute_reward(&c, &[first, second], "Dining", 100.0, date(2025, 6, 1), None);
        assert_eq!(result.notes.as_deref(), Some("first"));
    }

    #[test]
    fn test_reward_value_rounding_and_zero_amount() {
        assert_eq!(reward_value(33.33, 3.0), 1.0);
        assert_eq!(reward_value(0.0, 5.0), 0.0);
        assert_eq!(reward_value(-10.0, 5.0), 0.0);
    }
}

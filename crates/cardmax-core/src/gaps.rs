//! Portfolio gap analysis
//!
//! Compares the rates a user's owned cards can achieve per category
//! against the catalog-wide best, reports categories where the
//! portfolio underperforms, and suggests non-owned cards to close each
//! gap. Per-category computations are independent and fan out on a
//! `JoinSet`.

use chrono::NaiveDate;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::warn;

use crate::caps::infer_cap_period;
use crate::catalog::Catalog;
use crate::models::{
    CardSuggestion, CategoryComparison, GapPriority, GapReport, OwnedCardRate, PortfolioGap,
};
use crate::rewards::reward_applies;
use crate::taxonomy::Taxonomy;

/// Thresholds for gap detection and suggestion filtering
#[derive(Debug, Clone)]
pub struct GapConfig {
    /// Minimum market-vs-user improvement to report a gap at all
    pub min_improvement: f64,
    /// Improvement at or above this is at least medium priority
    pub medium_threshold: f64,
    /// Improvement at or above this is high priority
    pub high_threshold: f64,
    /// Multipliers above this are treated as catalog data errors
    pub market_rate_clamp: f64,
    /// Suggestions attached per gap
    pub suggestion_limit: usize,
    /// A suggested card must beat the user's best by more than this
    pub min_upgrade_increment: f64,
    /// Category-mode coverage is "good enough" within this many points
    /// of market best
    pub coverage_margin: f64,
}

impl Default for GapConfig {
    fn default() -> Self {
        Self {
            min_improvement: 0.5,
            medium_threshold: 1.5,
            high_threshold: 3.0,
            market_rate_clamp: 10.0,
            suggestion_limit: 3,
            min_upgrade_increment: 0.5,
            coverage_margin: 1.0,
        }
    }
}

pub struct PortfolioGapAnalyzer {
    catalog: Arc<Catalog>,
    taxonomy: Arc<Taxonomy>,
    config: GapConfig,
}

impl PortfolioGapAnalyzer {
    pub fn new(catalog: Arc<Catalog>, taxonomy: Arc<Taxonomy>) -> Self {
        Self::with_config(catalog, taxonomy, GapConfig::default())
    }

    pub fn with_config(catalog: Arc<Catalog>, taxonomy: Arc<Taxonomy>, config: GapConfig) -> Self {
        Self {
            catalog,
            taxonomy,
            config,
        }
    }

    /// Auto mode: scan every tracked category for gaps, highest priority
    /// and improvement first.
    pub async fn analyze(&self, owned_card_ids: &[String], date: NaiveDate) -> Vec<GapReport> {
        let owned: Arc<Vec<String>> = Arc::new(owned_card_ids.to_vec());
        let mut set: JoinSet<Option<GapReport>> = JoinSet::new();

        for category in self.taxonomy.category_names() {
            let category = category.to_string();
            let catalog = Arc::clone(&self.catalog);
            let taxonomy = Arc::clone(&self.taxonomy);
            let config = self.config.clone();
            let owned = Arc::clone(&owned);
            set.spawn(async move {
                analyze_category(&catalog, &taxonomy, &config, &owned, &category, date)
            });
        }

        let mut reports = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Some(report)) => reports.push(report),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Gap analysis task failed"),
            }
        }

        reports.sort_by(|a, b| {
            b.gap
                .priority
                .rank()
                .cmp(&a.gap.priority.rank())
                .then_with(|| {
                    b.gap
                        .improvement
                        .partial_cmp(&a.gap.improvement)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
        });
        reports
    }

    /// Category mode: the user's current coverage for one category plus
    /// the market cards that beat it.
    pub fn compare_category(
        &self,
        owned_card_ids: &[String],
        category: &str,
        date: NaiveDate,
    ) -> CategoryComparison {
        let mut user_cards: Vec<OwnedCardRate> = self
            .catalog
            .entries()
            .iter()
            .filter(|e| owned_card_ids.contains(&e.card.id))
            .map(|e| OwnedCardRate {
                card: e.card.clone(),
                rate: best_applicable_rate(&self.taxonomy, e, category, date).unwrap_or(1.0),
            })
            .collect();
        user_cards.sort_by(|a, b| {
            b.rate
                .partial_cmp(&a.rate)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    a.card
                        .annual_fee
                        .partial_cmp(&b.card.annual_fee)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
        });

        let user_best = user_cards.first().map(|c| c.rate).unwrap_or(1.0);
        let market_best = market_best_rate(&self.catalog, &self.taxonomy, &self.config, category, date);

        let upgrades: Vec<CardSuggestion> = self
            .catalog
            .top_for_category(&self.taxonomy, category, date)
            .into_iter()
            .filter(|(e, rate, _)| !owned_card_ids.contains(&e.card.id) && *rate > user_best)
            .take(self.config.suggestion_limit)
            .map(|(e, rate, reward)| CardSuggestion {
                card: e.card.clone(),
                rate,
                justification: justification(category, rate, reward),
            })
            .collect();

        CategoryComparison {
            category: category.to_string(),
            user_cards,
            upgrades,
            good_coverage: market_best - user_best <= self.config.coverage_margin,
        }
    }
}

fn analyze_category(
    catalog: &Catalog,
    taxonomy: &Taxonomy,
    config: &GapConfig,
    owned: &[String],
    category: &str,
    date: NaiveDate,
) -> Option<GapReport> {
    let user_best = catalog
        .entries()
        .iter()
        .filter(|e| owned.contains(&e.card.id))
        .filter_map(|e| best_applicable_rate(taxonomy, e, category, date))
        .fold(1.0_f64, f64::max);

    let market_best = market_best_rate(catalog, taxonomy, config, category, date);

    let improvement = market_best - user_best;
    if improvement < config.min_improvement {
        return None;
    }

    let priority = if improvement >= config.high_threshold {
        GapPriority::High
    } else if improvement >= config.medium_threshold {
        GapPriority::Medium
    } else {
        GapPriority::Low
    };

    let suggestions: Vec<CardSuggestion> = catalog
        .top_for_category(taxonomy, category, date)
        .into_iter()
        .filter(|(e, rate, _)| {
            !owned.contains(&e.card.id) && *rate > user_best + config.min_upgrade_increment
        })
        .take(config.suggestion_limit)
        .map(|(e, rate, reward)| CardSuggestion {
            card: e.card.clone(),
            rate,
            justification: justification(category, rate, reward),
        })
        .collect();

    Some(GapReport {
        gap: PortfolioGap {
            category: category.to_string(),
            user_best_rate: user_best,
            market_best_rate: market_best,
            improvement,
            priority,
        },
        suggestions,
    })
}

/// Best multiplier a single card offers for a category, if any applies
fn best_applicable_rate(
    taxonomy: &Taxonomy,
    entry: &crate::catalog::CatalogEntry,
    category: &str,
    date: NaiveDate,
) -> Option<f64> {
    entry
        .rewards
        .iter()
        .filter(|r| reward_applies(taxonomy, r, category, date))
        .map(|r| r.multiplier)
        .fold(None, |acc, m| Some(acc.map_or(m, |a: f64| a.max(m))))
}

/// Catalog-wide best multiplier, clamped to exclude data outliers
fn market_best_rate(
    catalog: &Catalog,
    taxonomy: &Taxonomy,
    config: &GapConfig,
    category: &str,
    date: NaiveDate,
) -> f64 {
    catalog
        .entries()
        .iter()
        .filter_map(|e| best_applicable_rate(taxonomy, e, category, date))
        .fold(1.0_f64, f64::max)
        .min(config.market_rate_clamp)
}

/// Human-readable reason a suggested card closes the gap, derived from
/// the reward's metadata.
fn justification(category: &str, rate: f64, reward: &crate::models::Reward) -> String {
    if reward.portal_only {
        format!(
            "Earns {rate}x on {category} when booked through the issuer portal"
        )
    } else if reward.cap.is_some() {
        let period = infer_cap_period(reward.notes.as_deref());
        format!("Earns {rate}x on {category} up to a {period} spending cap")
    } else {
        format!("Earns an unconditional {rate}x on {category}")
    }
}

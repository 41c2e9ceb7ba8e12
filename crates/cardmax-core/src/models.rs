//! Domain models for cardmax

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A payment card from the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub name: String,
    pub issuer: String,
    pub network: String,
    #[serde(default)]
    pub annual_fee: f64,
}

/// A reward rule attached to a card
///
/// The category may be a canonical taxonomy category or the reserved
/// wildcard `"All"`. The cap reset period is not stored; it is inferred
/// from the free-text notes (see `caps::infer_cap_period`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reward {
    pub card_id: String,
    pub category: String,
    pub multiplier: f64,
    #[serde(default)]
    pub cap: Option<f64>,
    #[serde(default)]
    pub portal_only: bool,
    /// Inclusive validity window
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Reward {
    /// Whether the reference date falls inside the inclusive validity window
    pub fn valid_on(&self, date: NaiveDate) -> bool {
        self.start_date.map_or(true, |s| date >= s) && self.end_date.map_or(true, |e| date <= e)
    }
}

/// A user owns a card
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCardOwnership {
    pub user_id: String,
    pub card_id: String,
}

/// A recorded purchase in the append-only spending ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendingRecord {
    pub id: i64,
    pub user_id: String,
    pub card_id: String,
    pub category: String,
    pub amount: f64,
    pub date: NaiveDate,
}

/// Insert shape for a spending record
#[derive(Debug, Clone)]
pub struct NewSpendingRecord {
    pub user_id: String,
    pub card_id: String,
    pub category: String,
    pub amount: f64,
    pub date: NaiveDate,
}

/// Where a classification result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationSource {
    /// Tier-1 lexical, merchant pattern drove the win
    Merchant,
    /// Tier-1 lexical, keyword scoring drove the win
    Keyword,
    /// Tier-2 vector search
    Semantic,
    /// Tier-3 generative model
    Llm,
    /// Served from the classifier cache
    Cache,
    /// Degraded result (empty input, no signals)
    Fallback,
}

impl ClassificationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Merchant => "merchant",
            Self::Keyword => "keyword",
            Self::Semantic => "semantic",
            Self::Llm => "llm",
            Self::Cache => "cache",
            Self::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for ClassificationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classifier tier that a caller can force for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifyMethod {
    Keyword,
    Semantic,
    Generative,
}

impl std::str::FromStr for ClassifyMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "keyword" | "lexical" => Ok(Self::Keyword),
            "semantic" | "vector" => Ok(Self::Semantic),
            "generative" | "llm" => Ok(Self::Generative),
            _ => Err(format!("Unknown classify method: {}", s)),
        }
    }
}

/// Result of classifying a purchase description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: String,
    /// In [0, 1]
    pub confidence: f64,
    pub source: ClassificationSource,
    pub reasoning: String,
}

impl ClassificationResult {
    /// Degraded result for empty or signal-free input
    pub fn fallback(reasoning: impl Into<String>) -> Self {
        Self {
            category: crate::taxonomy::OTHER.to_string(),
            confidence: 0.1,
            source: ClassificationSource::Fallback,
            reasoning: reasoning.into(),
        }
    }
}

/// Remaining headroom under a reward's spending cap
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapStatus {
    pub remaining: f64,
    pub total: f64,
    pub used: f64,
    /// Percentage of the cap consumed, 0-100
    pub percentage: f64,
}

impl CapStatus {
    pub fn new(total: f64, used: f64) -> Self {
        let remaining = (total - used).max(0.0);
        let percentage = if total > 0.0 {
            (used / total * 100.0).min(100.0)
        } else {
            0.0
        };
        Self {
            remaining,
            total,
            used,
            percentage,
        }
    }
}

/// Computed reward for a card/category/amount/date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardBreakdown {
    pub category: String,
    /// Headline multiplier of the winning reward
    pub multiplier: f64,
    /// Multiplier actually applicable after cap adjustments
    pub effective_rate: f64,
    /// Currency value, amount * effective_rate / 100, 2 decimals
    pub reward_value: f64,
    pub portal_only: bool,
    pub cap_status: Option<CapStatus>,
    pub notes: Option<String>,
}

/// A card ordered by the recommendation ranker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCard {
    pub card: Card,
    pub result: RewardBreakdown,
    /// Display-only ease-of-use score, never a sort key
    pub simplicity: i32,
}

/// Priority of a portfolio gap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapPriority {
    Low,
    Medium,
    High,
}

impl GapPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Numeric rank for sorting (higher = more urgent)
    pub fn rank(&self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }
}

impl std::fmt::Display for GapPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for GapPriority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!("Unknown gap priority: {}", s)),
        }
    }
}

/// A category where the user's portfolio trails the market
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioGap {
    pub category: String,
    pub user_best_rate: f64,
    pub market_best_rate: f64,
    pub improvement: f64,
    pub priority: GapPriority,
}

/// A non-owned card suggested to close a gap
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardSuggestion {
    pub card: Card,
    pub rate: f64,
    pub justification: String,
}

/// A gap plus the acquisition suggestions attached to it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapReport {
    pub gap: PortfolioGap,
    pub suggestions: Vec<CardSuggestion>,
}

/// An owned card and its achievable rate for a category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnedCardRate {
    pub card: Card,
    pub rate: f64,
}

/// Category-mode comparison: owned coverage vs the market
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryComparison {
    pub category: String,
    /// Owned cards sorted by rate desc, annual fee asc
    pub user_cards: Vec<OwnedCardRate>,
    /// Non-owned cards beating the user's best rate
    pub upgrades: Vec<CardSuggestion>,
    /// True when the user is within one rate point of market best
    pub good_coverage: bool,
}

//! cardmax Core Library
//!
//! Recommendation engine for payment-card rewards:
//! - Cascading text classifier (lexical, semantic, generative tiers)
//! - Reward calculator with cap-period resolution and blended rates
//! - Recommendation ranker
//! - Portfolio gap analyzer with acquisition suggestions
//! - Append-only spending ledger (SQLite or in-memory)
//!
//! HTTP serving, auth, and UI concerns live outside this crate; the
//! card catalog and the spending ledger are treated as externally owned
//! collaborators behind `Catalog` and `SpendingLedger`.

pub mod caps;
pub mod catalog;
pub mod classify;
pub mod db;
pub mod error;
pub mod gaps;
pub mod ledger;
pub mod models;
pub mod rank;
pub mod rewards;
pub mod taxonomy;

pub use caps::{infer_cap_period, CapPeriod, SpendingCapTracker};
pub use catalog::{Catalog, CatalogEntry};
pub use classify::{
    CategoryClassifier, CategoryMatch, ClassifierConfig, HttpVectorSearch, MockTextGen,
    MockVectorSearch, OllamaTextGen, RateLimiter, TextGen, VectorSearch,
};
pub use db::Database;
pub use error::{Error, Result};
pub use gaps::{GapConfig, PortfolioGapAnalyzer};
pub use ledger::{MemoryLedger, SpendingLedger};
pub use models::{
    CapStatus, Card, CardSuggestion, CategoryComparison, ClassificationResult,
    ClassificationSource, ClassifyMethod, GapPriority, GapReport, NewSpendingRecord,
    OwnedCardRate, PortfolioGap, RankedCard, Reward, RewardBreakdown, SpendingRecord,
    UserCardOwnership,
};
pub use rank::RecommendationRanker;
pub use rewards::RewardCalculator;
pub use taxonomy::{Taxonomy, OTHER, WILDCARD};

//! Spending cap tracking
//!
//! Resolves the cap reset window for a capped reward and sums the
//! user's matching spend inside it. Period inference is fragile string
//! matching over the reward's free-text notes; it lives behind one
//! function with an explicit yearly default so a structured replacement
//! only has to touch this file.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ledger::SpendingLedger;
use crate::models::Reward;
use crate::taxonomy::Taxonomy;

/// Recurring window over which a spending cap resets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapPeriod {
    Monthly,
    Quarterly,
    Yearly,
}

impl CapPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        }
    }
}

impl std::fmt::Display for CapPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Infer a cap's reset period from reward notes. Defaults to yearly
/// when the notes are absent or say nothing recognizable.
pub fn infer_cap_period(notes: Option<&str>) -> CapPeriod {
    let Some(notes) = notes else {
        return CapPeriod::Yearly;
    };
    let notes = notes.to_lowercase();
    if notes.contains("month") {
        CapPeriod::Monthly
    } else if notes.contains("quarter") {
        CapPeriod::Quarterly
    } else {
        CapPeriod::Yearly
    }
}

/// Inclusive `[start, end]` calendar window enclosing a reference date
pub fn period_window(period: CapPeriod, date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let year = date.year();
    match period {
        CapPeriod::Monthly => {
            let start = NaiveDate::from_ymd_opt(year, date.month(), 1).unwrap_or(date);
            let end = next_month_start(year, date.month()).pred_opt().unwrap_or(date);
            (start, end)
        }
        CapPeriod::Quarterly => {
            let quarter_start_month = ((date.month() - 1) / 3) * 3 + 1;
            let start = NaiveDate::from_ymd_opt(year, quarter_start_month, 1).unwrap_or(date);
            let end = next_month_start(year, quarter_start_month + 2)
                .pred_opt()
                .unwrap_or(date);
            (start, end)
        }
        CapPeriod::Yearly => (
            NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(date),
            NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(date),
        ),
    }
}

/// First day of the month after (year, month)
fn next_month_start(year: i32, month: u32) -> NaiveDate {
    if month >= 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1).expect("valid date")
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1).expect("valid date")
    }
}

/// Resolves cap windows and accumulated spend against the ledger
pub struct SpendingCapTracker<'a> {
    ledger: &'a dyn SpendingLedger,
    taxonomy: &'a Taxonomy,
}

impl<'a> SpendingCapTracker<'a> {
    pub fn new(ledger: &'a dyn SpendingLedger, taxonomy: &'a Taxonomy) -> Self {
        Self { ledger, taxonomy }
    }

    /// Sum of the user's spend counting against a reward's cap for the
    /// period enclosing the reference date.
    ///
    /// Returns 0 (not an error) when no user context is supplied or the
    /// ledger read fails: a missing cap figure must never block a
    /// recommendation, and overstating the remaining cap only makes the
    /// estimate optimistic.
    pub fn spend_in_period(
        &self,
        reward: &Reward,
        user_id: Option<&str>,
        date: NaiveDate,
    ) -> f64 {
        let Some(user_id) = user_id else {
            return 0.0;
        };

        let period = infer_cap_period(reward.notes.as_deref());
        let (start, end) = period_window(period, date);

        let records = match self
            .ledger
            .records_in_window(user_id, &reward.card_id, start, end)
        {
            Ok(records) => records,
            Err(e) => {
                warn!(
                    card_id = %reward.card_id,
                    error = %e,
                    "Cap lookup failed, treating period spend as zero"
                );
                return 0.0;
            }
        };

        records
            .iter()
            .filter(|r| self.taxonomy.matches(&reward.category, &r.category))
            .map(|r| r.amount)
            .sum()
    }
}

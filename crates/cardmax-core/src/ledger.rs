//! Spending ledger seam
//!
//! The ledger is externally owned and append-only: the engine reads
//! windowed spending for cap resolution and ownership rows for gap
//! analysis, and writes nothing but single spending-record inserts.
//! `db::Database` provides the SQLite implementation; `MemoryLedger`
//! backs tests and offline use.

use chrono::NaiveDate;
use std::sync::Mutex;

use crate::error::Result;
use crate::models::{NewSpendingRecord, SpendingRecord, UserCardOwnership};

pub trait SpendingLedger: Send + Sync {
    /// Spending records for a user+card inside an inclusive date window
    fn records_in_window(
        &self,
        user_id: &str,
        card_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<SpendingRecord>>;

    /// Append a spending record; returns its id. The ledger never
    /// mutates existing rows.
    fn insert_spending(&self, record: &NewSpendingRecord) -> Result<i64>;

    /// Card ids the user owns
    fn owned_card_ids(&self, user_id: &str) -> Result<Vec<String>>;

    /// Record that a user owns a card
    fn add_ownership(&self, user_id: &str, card_id: &str) -> Result<()>;
}

#[derive(Default)]
struct MemoryState {
    records: Vec<SpendingRecord>,
    ownership: Vec<UserCardOwnership>,
    next_id: i64,
}

/// In-memory ledger for tests and offline development
#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<MemoryState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpendingLedger for MemoryLedger {
    fn records_in_window(
        &self,
        user_id: &str,
        card_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<SpendingRecord>> {
        let state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        Ok(state
            .records
            .iter()
            .filter(|r| {
                r.user_id == user_id && r.card_id == card_id && r.date >= start && r.date <= end
            })
            .cloned()
            .collect())
    }

    fn insert_spending(&self, record: &NewSpendingRecord) -> Result<i64> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.next_id += 1;
        let id = state.next_id;
        state.records.push(SpendingRecord {
            id,
            user_id: record.user_id.clone(),
            card_id: record.card_id.clone(),
            category: record.category.clone(),
            amount: record.amount,
            date: record.date,
        });
        Ok(id)
    }

    fn owned_card_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        Ok(state
            .ownership
            .iter()
            .filter(|o| o.user_id == user_id)
            .map(|o| o.card_id.clone())
            .collect())
    }

    fn add_ownership(&self, user_id: &str, card_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if !state
            .ownership
            .iter()
            .any(|o| o.user_id == user_id && o.card_id == card_id)
        {
            state.ownership.push(UserCardOwnership {
                user_id: user_id.to_string(),
                card_id: card_id.to_string(),
            });
        }
        Ok(())
    }
}

/// Ledger whose reads always fail; exercises degraded paths in tests
#[cfg(test)]
pub(crate) struct FailingLedger;

#[cfg(test)]
impl SpendingLedger for FailingLedger {
    fn records_in_window(
        &self,
        _user_id: &str,
        _card_id: &str,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Vec<SpendingRecord>> {
        Err(crate::error::Error::Ledger("simulated read failure".into()))
    }

    fn insert_spending(&self, _record: &NewSpendingRecord) -> Result<i64> {
        Err(crate::error::Error::Ledger("simulated write failure".into()))
    }

    fn owned_card_ids(&self, _user_id: &str) -> Result<Vec<String>> {
        Err(crate::error::Error::Ledger("simulated read failure".into()))
    }

    fn add_ownership(&self, _user_id: &str, _card_id: &str) -> Result<()> {
        Err(crate::error::Error::Ledger("simulated write failure".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user: &str, card: &str, amount: f64, date: (i32, u32, u32)) -> NewSpendingRecord {
        NewSpendingRecord {
            user_id: user.into(),
            card_id: card.into(),
            category: "Grocery".into(),
            amount,
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        }
    }

    #[test]
    fn test_memory_ledger_window_filtering() {
        let ledger = MemoryLedger::new();
        ledger.insert_spending(&record("u1", "c1", 50.0, (2025, 3, 10))).unwrap();
        ledger.insert_spending(&record("u1", "c1", 75.0, (2025, 6, 1))).unwrap();
        ledger.insert_spending(&record("u2", "c1", 99.0, (2025, 3, 12))).unwrap();

        let records = ledger
            .records_in_window(
                "u1",
                "c1",
                NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
            )
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount, 50.0);
    }

    #[test]
    fn test_ownership_is_idempotent() {
        let ledger = MemoryLedger::new();
        ledger.add_ownership("u1", "c1").unwrap();
        ledger.add_ownership("u1", "c1").unwrap();
        assert_eq!(ledger.owned_card_ids("u1").unwrap(), vec!["c1".to_string()]);
    }
}

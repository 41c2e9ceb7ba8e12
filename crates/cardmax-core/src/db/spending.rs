//! Spending record and ownership queries

use chrono::NaiveDate;
use rusqlite::params;

use super::Database;
use crate::error::{Error, Result};
use crate::ledger::SpendingLedger;
use crate::models::{NewSpendingRecord, SpendingRecord};

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| Error::InvalidData(format!("Bad date in ledger: {}", e)))
}

impl SpendingLedger for Database {
    fn records_in_window(
        &self,
        user_id: &str,
        card_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<SpendingRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, card_id, category, amount, date
            FROM spending_records
            WHERE user_id = ? AND card_id = ? AND date >= ? AND date <= ?
            ORDER BY date
            "#,
        )?;

        let rows = stmt.query_map(
            params![user_id, card_id, start.to_string(), end.to_string()],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, String>(5)?,
                ))
            },
        )?;

        let mut records = Vec::new();
        for row in rows {
            let (id, user_id, card_id, category, amount, date) = row?;
            records.push(SpendingRecord {
                id,
                user_id,
                card_id,
                category,
                amount,
                date: parse_date(&date)?,
            });
        }
        Ok(records)
    }

    // The single write path of the engine: one indivisible insert,
    // existing rows are never touched.
    fn insert_spending(&self, record: &NewSpendingRecord) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO spending_records (user_id, card_id, category, amount, date)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                record.user_id,
                record.card_id,
                record.category,
                record.amount,
                record.date.to_string(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn owned_card_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT card_id FROM user_cards WHERE user_id = ? ORDER BY card_id")?;
        let rows = stmt.query_map(params![user_id], |row| row.get::<_, String>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    fn add_ownership(&self, user_id: &str, card_id: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO user_cards (user_id, card_id) VALUES (?, ?)",
            params![user_id, card_id],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(amount: f64, at: NaiveDate) -> NewSpendingRecord {
        NewSpendingRecord {
            user_id: "u1".into(),
            card_id: "c1".into(),
            category: "Grocery".into(),
            amount,
            date: at,
        }
    }

    #[test]
    fn test_insert_and_window_query() {
        let db = Database::open_in_memory().unwrap();
        db.insert_spending(&record(100.0, date(2025, 3, 5))).unwrap();
        db.insert_spending(&record(250.0, date(2025, 3, 28))).unwrap();
        db.insert_spending(&record(42.0, date(2025, 4, 2))).unwrap();

        let march = db
            .records_in_window("u1", "c1", date(2025, 3, 1), date(2025, 3, 31))
            .unwrap();
        assert_eq!(march.len(), 2);
        assert_eq!(march[0].amount, 100.0);
        assert_eq!(march[1].date, date(2025, 3, 28));
    }

    #[test]
    fn test_window_query_scopes_user_and_card() {
        let db = Database::open_in_memory().unwrap();
        db.insert_spending(&record(100.0, date(2025, 3, 5))).unwrap();
        db.insert_spending(&NewSpendingRecord {
            card_id: "c2".into(),
            ..record(75.0, date(2025, 3, 6))
        })
        .unwrap();

        let records = db
            .records_in_window("u1", "c1", date(2025, 1, 1), date(2025, 12, 31))
            .unwrap();
        assert_eq!(records.len(), 1);
        assert!(db
            .records_in_window("u2", "c1", date(2025, 1, 1), date(2025, 12, 31))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_ownership_round_trip() {
        let db = Database::open_in_memory().unwrap();
        db.add_ownership("u1", "grocer").unwrap();
        db.add_ownership("u1", "foodie").unwrap();
        db.add_ownership("u1", "foodie").unwrap();
        assert_eq!(
            db.owned_card_ids("u1").unwrap(),
            vec!["foodie".to_string(), "grocer".to_string()]
        );
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let db = Database::open(path.to_str().unwrap()).unwrap();
        db.insert_spending(&record(10.0, date(2025, 1, 1))).unwrap();
        drop(db);

        let reopened = Database::open(path.to_str().unwrap()).unwrap();
        let records = reopened
            .records_in_window("u1", "c1", date(2025, 1, 1), date(2025, 1, 31))
            .unwrap();
        assert_eq!(records.len(), 1);
    }
}

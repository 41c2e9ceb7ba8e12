//! SQLite-backed spending ledger with connection pooling
//!
//! Backs the `SpendingLedger` seam with two tables:
//! - `spending_records` - append-only purchase ledger
//! - `user_cards` - card ownership rows
//!
//! The card/reward catalog itself never lives here; it is externally
//! owned reference data (see `catalog`).

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::Result;

mod spending;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open (creating if needed) a ledger database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().max_size(8).build(manager)?;
        let db = Self { pool };
        db.init_schema()?;
        info!(path = %path, "Ledger database opened");
        Ok(db)
    }

    /// Open an in-memory ledger (single shared connection)
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager)?;
        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    pub(crate) fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS spending_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                card_id TEXT NOT NULL,
                category TEXT NOT NULL,
                amount REAL NOT NULL,
                date TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_spending_user_card_date
                ON spending_records (user_id, card_id, date);

            CREATE TABLE IF NOT EXISTS user_cards (
                user_id TEXT NOT NULL,
                card_id TEXT NOT NULL,
                PRIMARY KEY (user_id, card_id)
            );
            "#,
        )?;
        Ok(())
    }
}

use std::str::FromStr;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::error::MarketError;
use crate::gateway::PriceSource;

/// A raw row from the quote board.
#[derive(Debug, Clone)]
pub struct QuoteRow {
    pub symbol: String,
    pub price: String,
    pub updated_at: String,
    pub expires_at: String,
}

/// Read side of the quote board.
///
/// The quotes database is written by the feed daemon (or whatever external
/// price pipeline replaces it) and read here. Expired quotes are treated
/// as absent, so a dead feed degrades into `PriceUnavailable` rather than
/// stale fills.
///
/// SQLite access is synchronized via `Mutex` since `rusqlite::Connection`
/// is not `Sync`.
pub struct QuoteReader {
    conn: Mutex<Connection>,
}

impl QuoteReader {
    /// Open a read-only connection to the quote board.
    pub fn open(path: &str) -> Result<Self, MarketError> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory board. Writable so tests can seed quotes.
    pub fn open_in_memory() -> Result<Self, MarketError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(tradefloor_models::schema::QUOTES_DDL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Get the current quote for a symbol, or None if missing or expired.
    pub fn quote(&self, symbol: &str) -> Result<Option<QuoteRow>, MarketError> {
        let now = Utc::now().to_rfc3339();
        let conn = self
            .conn
            .lock()
            .map_err(|e| MarketError::Unavailable(format!("quote mutex poisoned: {e}")))?;
        let mut stmt = conn.prepare_cached(
            "SELECT symbol, price, updated_at, expires_at \
             FROM quotes WHERE symbol = ?1 AND expires_at > ?2",
        )?;

        let result = stmt.query_row(rusqlite::params![symbol, now], |row| {
            Ok(QuoteRow {
                symbol: row.get(0)?,
                price: row.get(1)?,
                updated_at: row.get(2)?,
                expires_at: row.get(3)?,
            })
        });

        match result {
            Ok(row) => Ok(Some(row)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(MarketError::Sqlite(e)),
        }
    }

    /// Seed a quote directly through the reader's connection. Only
    /// meaningful on writable (in-memory) boards.
    pub fn insert(&self, row: &QuoteRow) -> Result<(), MarketError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| MarketError::Unavailable(format!("quote mutex poisoned: {e}")))?;
        conn.execute(
            "INSERT OR REPLACE INTO quotes (symbol, price, updated_at, expires_at) \
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![row.symbol, row.price, row.updated_at, row.expires_at],
        )?;
        Ok(())
    }
}

#[async_trait]
impl PriceSource for QuoteReader {
    async fn price(&self, symbol: &str) -> Result<Decimal, MarketError> {
        let row = self
            .quote(symbol)?
            .ok_or_else(|| MarketError::PriceUnavailable(symbol.to_string()))?;
        Decimal::from_str(&row.price).map_err(|_| MarketError::BadQuote {
            symbol: symbol.to_string(),
            value: row.price,
        })
    }
}

/// Write side of the quote board, used by the feed daemon.
/// Opens read-write with WAL so the host process can read concurrently.
pub struct QuoteWriter {
    conn: Connection,
}

impl QuoteWriter {
    pub fn open(path: &str) -> Result<Self, MarketError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(tradefloor_models::schema::QUOTES_DDL)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, MarketError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(tradefloor_models::schema::QUOTES_DDL)?;
        Ok(Self { conn })
    }

    /// Upsert a batch of quotes in one transaction.
    pub fn upsert_batch(&mut self, rows: &[QuoteRow]) -> Result<(), MarketError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO quotes (symbol, price, updated_at, expires_at) \
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for row in rows {
                stmt.execute(rusqlite::params![
                    row.symbol,
                    row.price,
                    row.updated_at,
                    row.expires_at,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Latest stored price for a symbol, expired or not. The feed daemon
    /// uses this to continue a random walk across restarts.
    pub fn last_price(&self, symbol: &str) -> Result<Option<Decimal>, MarketError> {
        let result: Result<String, _> = self.conn.query_row(
            "SELECT price FROM quotes WHERE symbol = ?1",
            rusqlite::params![symbol],
            |row| row.get(0),
        );
        match result {
            Ok(text) => Ok(Some(Decimal::from_str(&text).map_err(|_| {
                MarketError::BadQuote {
                    symbol: symbol.to_string(),
                    value: text,
                }
            })?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(MarketError::Sqlite(e)),
        }
    }

    /// Delete quotes past their expiry. Returns the number of rows removed.
    pub fn expire_stale(&self) -> Result<usize, MarketError> {
        let now = Utc::now().to_rfc3339();
        let deleted = self.conn.execute(
            "DELETE FROM quotes WHERE expires_at < ?1",
            rusqlite::params![now],
        )?;
        Ok(deleted)
    }

    pub fn count(&self) -> Result<usize, MarketError> {
        let count: usize = self
            .conn
            .query_row("SELECT COUNT(*) FROM quotes", [], |row| row.get(0))?;
        Ok(count)
    }
}

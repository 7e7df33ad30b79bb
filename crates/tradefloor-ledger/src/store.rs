use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;
use tradefloor_models::account::{Holdings, PortfolioPoint, Side, TransactionRecord};

use crate::error::LedgerError;

/// A raw account row, decoded.
#[derive(Debug, Clone)]
pub struct AccountRow {
    pub name: String,
    pub balance: Decimal,
    pub holdings: Holdings,
    pub strategy: String,
}

/// Fields of a transaction about to be written. The id is assigned by
/// SQLite on insert.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub side: Side,
    pub rationale: Option<String>,
}

/// The ledger's SQLite connection and all of its SQL.
///
/// Every mutating operation that spans tables runs inside a single rusqlite
/// transaction, so a crash or mid-flight error can never leave a debit
/// without its holding increment or transaction record.
pub struct LedgerStore {
    conn: Connection,
}

impl LedgerStore {
    /// Open (or create) the ledger database. Enables WAL so the dashboard
    /// can read while the floor writes.
    pub fn open(path: &str) -> Result<Self, LedgerError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(tradefloor_models::schema::LEDGER_DDL)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self { conn })
    }

    /// Open an in-memory ledger for testing.
    pub fn open_in_memory() -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(tradefloor_models::schema::LEDGER_DDL)?;
        Ok(Self { conn })
    }

    /// Insert an account unless it already exists. Returns true if this
    /// call created it.
    pub fn create_account_if_absent(
        &self,
        name: &str,
        balance: Decimal,
        strategy: &str,
    ) -> Result<bool, LedgerError> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO accounts (name, balance, holdings_json, strategy) \
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![name, balance.to_string(), "{}", strategy],
        )?;
        Ok(inserted > 0)
    }

    pub fn account(&self, name: &str) -> Result<Option<AccountRow>, LedgerError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT name, balance, holdings_json, strategy FROM accounts WHERE name = ?1",
        )?;
        let result = stmt.query_row(rusqlite::params![name], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        });

        match result {
            Ok((name, balance, holdings_json, strategy)) => Ok(Some(AccountRow {
                name,
                balance: parse_decimal(&balance)?,
                holdings: serde_json::from_str(&holdings_json)?,
                strategy,
            })),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(LedgerError::Store(e)),
        }
    }

    /// Apply a settled trade as one indivisible unit: update the account
    /// row, append the transaction, append the valuation snapshot.
    /// Returns the new transaction's id.
    pub fn apply_trade(
        &mut self,
        name: &str,
        balance: Decimal,
        holdings: &Holdings,
        txn: &NewTransaction,
        total_value: Decimal,
    ) -> Result<i64, LedgerError> {
        let holdings_json = serde_json::to_string(holdings)?;
        let timestamp = txn.timestamp.to_rfc3339();

        let tx = self.conn.transaction()?;
        tx.execute(
            "UPDATE accounts SET balance = ?2, holdings_json = ?3 WHERE name = ?1",
            rusqlite::params![name, balance.to_string(), holdings_json],
        )?;
        tx.execute(
            "INSERT INTO transactions (name, timestamp, symbol, quantity, price, side, rationale) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                name,
                timestamp,
                txn.symbol,
                txn.quantity.to_string(),
                txn.price.to_string(),
                txn.side.as_str(),
                txn.rationale,
            ],
        )?;
        let txn_id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO portfolio_snapshots (name, timestamp, total_value) VALUES (?1, ?2, ?3)",
            rusqlite::params![name, timestamp, total_value.to_string()],
        )?;
        tx.commit()?;
        Ok(txn_id)
    }

    pub fn insert_snapshot(
        &self,
        name: &str,
        timestamp: DateTime<Utc>,
        total_value: Decimal,
    ) -> Result<(), LedgerError> {
        self.conn.execute(
            "INSERT INTO portfolio_snapshots (name, timestamp, total_value) VALUES (?1, ?2, ?3)",
            rusqlite::params![name, timestamp.to_rfc3339(), total_value.to_string()],
        )?;
        Ok(())
    }

    /// Most recent transactions for an account, newest first.
    pub fn recent_transactions(
        &self,
        name: &str,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, name, timestamp, symbol, quantity, price, side, rationale \
             FROM transactions WHERE name = ?1 ORDER BY id DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![name, limit as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, Option<String>>(7)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(
                |(id, account, timestamp, symbol, quantity, price, side, rationale)| {
                    Ok(TransactionRecord {
                        id,
                        account,
                        timestamp: parse_timestamp(&timestamp)?,
                        symbol,
                        quantity: parse_decimal(&quantity)?,
                        price: parse_decimal(&price)?,
                        side: Side::parse(&side)
                            .ok_or_else(|| LedgerError::Corrupt(format!("side {side}")))?,
                        rationale,
                    })
                },
            )
            .collect()
    }

    /// The full portfolio value series for an account, oldest first.
    pub fn value_series(&self, name: &str) -> Result<Vec<PortfolioPoint>, LedgerError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT timestamp, total_value FROM portfolio_snapshots \
             WHERE name = ?1 ORDER BY timestamp ASC, rowid ASC",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![name], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(timestamp, total_value)| {
                Ok(PortfolioPoint {
                    timestamp: parse_timestamp(&timestamp)?,
                    total_value: parse_decimal(&total_value)?,
                })
            })
            .collect()
    }

    pub fn transaction_count(&self, name: &str) -> Result<usize, LedgerError> {
        let count: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE name = ?1",
            rusqlite::params![name],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn parse_decimal(text: &str) -> Result<Decimal, LedgerError> {
    Decimal::from_str(text).map_err(|_| LedgerError::Corrupt(format!("decimal {text}")))
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, LedgerError> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| LedgerError::Corrupt(format!("timestamp {text}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn buy_txn(symbol: &str, quantity: Decimal, price: Decimal) -> NewTransaction {
        NewTransaction {
            timestamp: Utc::now(),
            symbol: symbol.to_string(),
            quantity,
            price,
            side: Side::Buy,
            rationale: None,
        }
    }

    #[test]
    fn create_is_idempotent() {
        let store = LedgerStore::open_in_memory().unwrap();
        assert!(store
            .create_account_if_absent("Warren", dec!(10000), "value")
            .unwrap());
        assert!(!store
            .create_account_if_absent("Warren", dec!(99999), "other")
            .unwrap());

        // The losing create changes nothing.
        let row = store.account("Warren").unwrap().unwrap();
        assert_eq!(row.balance, dec!(10000));
        assert_eq!(row.strategy, "value");
        assert!(row.holdings.is_empty());
    }

    #[test]
    fn missing_account_is_none() {
        let store = LedgerStore::open_in_memory().unwrap();
        assert!(store.account("Nobody").unwrap().is_none());
    }

    #[test]
    fn apply_trade_writes_all_three_tables() {
        let mut store = LedgerStore::open_in_memory().unwrap();
        store
            .create_account_if_absent("Warren", dec!(1000), "value")
            .unwrap();

        let mut holdings = Holdings::new();
        holdings.insert("AAA".to_string(), dec!(5));
        let id = store
            .apply_trade(
                "Warren",
                dec!(500),
                &holdings,
                &buy_txn("AAA", dec!(5), dec!(100)),
                dec!(1000),
            )
            .unwrap();
        assert!(id > 0);

        let row = store.account("Warren").unwrap().unwrap();
        assert_eq!(row.balance, dec!(500));
        assert_eq!(row.holdings.get("AAA"), Some(&dec!(5)));

        let txns = store.recent_transactions("Warren", 10).unwrap();
        assert_eq!(txns.len(), 1);
        assert_eq!(store.transaction_count("Warren").unwrap(), 1);
        assert_eq!(txns[0].id, id);
        assert_eq!(txns[0].side, Side::Buy);
        assert_eq!(txns[0].price, dec!(100));

        let series = store.value_series("Warren").unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].total_value, dec!(1000));
    }

    #[test]
    fn recent_transactions_newest_first() {
        let mut store = LedgerStore::open_in_memory().unwrap();
        store
            .create_account_if_absent("Warren", dec!(1000), "value")
            .unwrap();

        let holdings = Holdings::new();
        for i in 1..=5 {
            store
                .apply_trade(
                    "Warren",
                    dec!(1000),
                    &holdings,
                    &buy_txn("AAA", Decimal::from(i), dec!(1)),
                    dec!(1000),
                )
                .unwrap();
        }

        let txns = store.recent_transactions("Warren", 3).unwrap();
        assert_eq!(txns.len(), 3);
        assert_eq!(txns[0].quantity, dec!(5));
        assert_eq!(txns[2].quantity, dec!(3));
    }

    #[test]
    fn value_series_is_chronological() {
        let store = LedgerStore::open_in_memory().unwrap();
        store
            .create_account_if_absent("Ray", dec!(1000), "systematic")
            .unwrap();

        let base = Utc::now();
        for i in 0..3 {
            store
                .insert_snapshot(
                    "Ray",
                    base + chrono::Duration::seconds(i),
                    dec!(1000) + Decimal::from(i),
                )
                .unwrap();
        }

        let series = store.value_series("Ray").unwrap();
        assert_eq!(series.len(), 3);
        assert!(series.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(series[2].total_value, dec!(1002));
    }

    #[test]
    fn accounts_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let path = path.to_str().unwrap();

        {
            let store = LedgerStore::open(path).unwrap();
            store
                .create_account_if_absent("Cathie", dec!(10000), "growth")
                .unwrap();
        }

        let store = LedgerStore::open(path).unwrap();
        let row = store.account("Cathie").unwrap().unwrap();
        assert_eq!(row.balance, dec!(10000));
    }
}

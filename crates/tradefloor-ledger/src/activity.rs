use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tradefloor_models::activity::{LogCategory, LogEntry};

use crate::error::LedgerError;

/// Append-only activity feed, shared by the ledger and the orchestrator
/// and read by the dashboard.
///
/// Appends are best-effort: a storage failure is reported through the
/// tracing fallback and swallowed, because a broken log must never abort a
/// trade or take down the floor.
pub struct ActivityLog {
    conn: Mutex<Connection>,
}

impl ActivityLog {
    /// Open the activity log on the shared ledger database file.
    pub fn open(path: &str) -> Result<Self, LedgerError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(tradefloor_models::schema::LEDGER_DDL)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(tradefloor_models::schema::LEDGER_DDL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Append an entry. Never fails; a write error falls back to stderr.
    pub fn append(&self, account: &str, category: LogCategory, message: &str) {
        if let Err(e) = self.try_append(account, category, message) {
            tracing::warn!(
                account,
                category = category.as_str(),
                message,
                error = %e,
                "Activity log write failed"
            );
        }
    }

    fn try_append(
        &self,
        account: &str,
        category: LogCategory,
        message: &str,
    ) -> Result<(), LedgerError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| LedgerError::Unavailable(format!("log mutex poisoned: {e}")))?;
        conn.execute(
            "INSERT INTO logs (timestamp, name, category, message) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![Utc::now().to_rfc3339(), account, category.as_str(), message],
        )?;
        Ok(())
    }

    /// The most recent `limit` entries for an account, newest first.
    /// Ordered by timestamp, ties broken by insertion sequence.
    pub fn read_recent(&self, account: &str, limit: usize) -> Result<Vec<LogEntry>, LedgerError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| LedgerError::Unavailable(format!("log mutex poisoned: {e}")))?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, timestamp, name, category, message FROM logs \
             WHERE name = ?1 ORDER BY timestamp DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![account, limit as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, timestamp, account, category, message)| {
                Ok(LogEntry {
                    id,
                    timestamp: parse_timestamp(&timestamp)?,
                    account,
                    category: LogCategory::parse(&category)
                        .ok_or_else(|| LedgerError::Corrupt(format!("category {category}")))?,
                    message,
                })
            })
            .collect()
    }

    /// Entries of a single category for an account, newest first.
    pub fn read_recent_by_category(
        &self,
        account: &str,
        category: LogCategory,
        limit: usize,
    ) -> Result<Vec<LogEntry>, LedgerError> {
        Ok(self
            .read_recent(account, 10_000)?
            .into_iter()
            .filter(|entry| entry.category == category)
            .take(limit)
            .collect())
    }
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, LedgerError> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| LedgerError::Corrupt(format!("timestamp {text}")))
}

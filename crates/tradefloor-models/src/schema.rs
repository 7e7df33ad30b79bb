/// SQLite schema for the ledger database.
///
/// Four logical tables:
/// - `accounts` — one row per trader; holdings are a JSON object mapping
///   symbol to quantity; balance and quantities are decimal strings.
/// - `transactions` — append-only trade history.
/// - `portfolio_snapshots` — append-only (timestamp, total value) series.
/// - `logs` — append-only activity feed read by the dashboard.
///
/// All timestamps are RFC 3339 text in UTC.
pub const LEDGER_DDL: &str = "\
CREATE TABLE IF NOT EXISTS accounts (
    name          TEXT PRIMARY KEY,
    balance       TEXT NOT NULL,
    holdings_json TEXT NOT NULL,
    strategy      TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS transactions (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    name      TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    symbol    TEXT NOT NULL,
    quantity  TEXT NOT NULL,
    price     TEXT NOT NULL,
    side      TEXT NOT NULL,
    rationale TEXT
);
CREATE TABLE IF NOT EXISTS portfolio_snapshots (
    name        TEXT NOT NULL,
    timestamp   TEXT NOT NULL,
    total_value TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS logs (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    name      TEXT NOT NULL,
    category  TEXT NOT NULL,
    message   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_transactions_name ON transactions(name);
CREATE INDEX IF NOT EXISTS idx_snapshots_name ON portfolio_snapshots(name);
CREATE INDEX IF NOT EXISTS idx_logs_name ON logs(name);
CREATE INDEX IF NOT EXISTS idx_logs_timestamp ON logs(timestamp);
";

/// SQLite schema for the quote board the market gateway reads.
///
/// Written by the feed daemon (or any external price pipeline) and read by
/// the ledger's price lookups. `expires_at` marks a quote stale; a stale
/// quote is treated as no quote at all.
pub const QUOTES_DDL: &str = "\
CREATE TABLE IF NOT EXISTS quotes (
    symbol     TEXT PRIMARY KEY,
    price      TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_quotes_expires ON quotes(expires_at);
";

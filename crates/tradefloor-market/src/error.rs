use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketError {
    #[error("Price unavailable for {0}")]
    PriceUnavailable(String),

    #[error("Market calendar unavailable: {0}")]
    CalendarUnavailable(String),

    #[error("Quote board not available: {0}")]
    Unavailable(String),

    #[error("Malformed quote for {symbol}: {value}")]
    BadQuote { symbol: String, value: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

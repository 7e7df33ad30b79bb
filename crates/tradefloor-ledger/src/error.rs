use rust_decimal::Decimal;
use thiserror::Error;
use tradefloor_market::MarketError;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Insufficient funds: cost {needed}, balance {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    #[error("Insufficient holdings of {symbol}: requested {requested}, held {held}")]
    InsufficientHoldings {
        symbol: String,
        requested: Decimal,
        held: Decimal,
    },

    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Market error: {0}")]
    Market(#[from] MarketError),

    #[error("SQLite error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corrupt ledger value: {0}")]
    Corrupt(String),

    #[error("Ledger not available: {0}")]
    Unavailable(String),
}

impl LedgerError {
    /// True for the per-instruction rejections the orchestrator logs and
    /// moves past, as opposed to storage faults.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            LedgerError::InvalidArgument(_)
                | LedgerError::InsufficientFunds { .. }
                | LedgerError::InsufficientHoldings { .. }
                | LedgerError::Market(MarketError::PriceUnavailable(_))
        )
    }
}

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::MarketError;

/// Resolves an instrument's current price. The ledger calls this fresh on
/// every buy/sell/snapshot; implementations must not serve quotes older
/// than their own freshness window, and callers never cache the result
/// beyond the operation that requested it.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn price(&self, symbol: &str) -> Result<Decimal, MarketError>;
}

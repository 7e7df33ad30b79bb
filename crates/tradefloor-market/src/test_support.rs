//! Test support: in-memory price sources for exercising the ledger and
//! orchestrator without a quote board.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::MarketError;
use crate::gateway::PriceSource;

/// A price source backed by a fixed map, adjustable mid-test.
pub struct StaticPrices {
    prices: Mutex<HashMap<String, Decimal>>,
}

impl StaticPrices {
    pub fn new(prices: impl IntoIterator<Item = (&'static str, Decimal)>) -> Self {
        Self {
            prices: Mutex::new(
                prices
                    .into_iter()
                    .map(|(s, p)| (s.to_string(), p))
                    .collect(),
            ),
        }
    }

    pub fn set(&self, symbol: &str, price: Decimal) {
        self.prices
            .lock()
            .expect("price map poisoned")
            .insert(symbol.to_string(), price);
    }
}

#[async_trait]
impl PriceSource for StaticPrices {
    async fn price(&self, symbol: &str) -> Result<Decimal, MarketError> {
        self.prices
            .lock()
            .expect("price map poisoned")
            .get(symbol)
            .copied()
            .ok_or_else(|| MarketError::PriceUnavailable(symbol.to_string()))
    }
}

/// A price source whose upstream is always unreachable.
pub struct FailingPrices;

#[async_trait]
impl PriceSource for FailingPrices {
    async fn price(&self, symbol: &str) -> Result<Decimal, MarketError> {
        Err(MarketError::PriceUnavailable(symbol.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn static_prices_resolve_and_update() {
        let prices = StaticPrices::new([("AAA", dec!(100))]);
        assert_eq!(prices.price("AAA").await.unwrap(), dec!(100));

        prices.set("AAA", dec!(110));
        assert_eq!(prices.price("AAA").await.unwrap(), dec!(110));

        assert!(matches!(
            prices.price("BBB").await,
            Err(MarketError::PriceUnavailable(_))
        ));
    }
}

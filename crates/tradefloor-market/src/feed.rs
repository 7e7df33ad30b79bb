use std::sync::{Arc, Mutex};

use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::quotes::{QuoteRow, QuoteWriter};

/// Configuration for the quote feed daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Path to the quote board SQLite file.
    pub quotes_path: String,
    /// Symbols to publish quotes for.
    pub symbols: Vec<String>,
    /// Seconds between quote refreshes.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_seconds: u64,
    /// TTL in seconds on each published quote.
    #[serde(default = "default_quote_ttl")]
    pub ttl_seconds: u64,
    /// Price assigned to a symbol the first time it is quoted.
    #[serde(default = "default_base_price")]
    pub base_price: Decimal,
}

fn default_refresh_interval() -> u64 {
    60
}
fn default_quote_ttl() -> u64 {
    600
}
fn default_base_price() -> Decimal {
    Decimal::new(100, 0)
}

/// Publishes random-walk quotes on an interval until cancelled.
///
/// This stands in for a real market data pipeline: the core only ever sees
/// the quotes table, so swapping in a live feed means replacing this
/// binary, not the ledger.
pub struct FeedDaemon {
    config: FeedConfig,
    writer: Arc<Mutex<QuoteWriter>>,
    cancel: CancellationToken,
}

impl FeedDaemon {
    pub fn new(config: FeedConfig, writer: QuoteWriter) -> Self {
        Self {
            config,
            writer: Arc::new(Mutex::new(writer)),
            cancel: CancellationToken::new(),
        }
    }

    /// Returns a CancellationToken that can be used to trigger shutdown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run until cancelled, refreshing immediately on startup.
    pub async fn run(&self) {
        tracing::info!(
            symbols = self.config.symbols.len(),
            interval = self.config.refresh_interval_seconds,
            "Quote feed starting"
        );

        let interval = std::time::Duration::from_secs(self.config.refresh_interval_seconds);
        publish_quotes(&self.config, &self.writer);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("Quote feed shutting down");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    publish_quotes(&self.config, &self.writer);
                }
            }
        }
    }
}

/// Execute one refresh: step every symbol's price and publish the batch.
fn publish_quotes(config: &FeedConfig, writer: &Arc<Mutex<QuoteWriter>>) {
    let now = Utc::now();
    let expires = now + chrono::Duration::seconds(config.ttl_seconds as i64);
    let mut rng = rand::thread_rng();

    let mut w = match writer.lock() {
        Ok(w) => w,
        Err(e) => {
            tracing::error!(error = %e, "Quote writer lock poisoned");
            return;
        }
    };

    let mut rows = Vec::with_capacity(config.symbols.len());
    for symbol in &config.symbols {
        let previous = match w.last_price(symbol) {
            Ok(Some(price)) => price,
            Ok(None) => config.base_price,
            Err(e) => {
                tracing::warn!(symbol, error = %e, "Failed to read last price");
                config.base_price
            }
        };
        let price = step_price(previous, rng.gen_range(-100..=100));
        rows.push(QuoteRow {
            symbol: symbol.clone(),
            price: price.to_string(),
            updated_at: now.to_rfc3339(),
            expires_at: expires.to_rfc3339(),
        });
    }

    match w.upsert_batch(&rows) {
        Ok(()) => tracing::info!(count = rows.len(), "Quote refresh complete"),
        Err(e) => tracing::error!(error = %e, "Failed to publish quotes"),
    }

    match w.expire_stale() {
        Ok(deleted) if deleted > 0 => {
            tracing::info!(deleted, "Removed stale quotes");
        }
        Ok(_) => {}
        Err(e) => tracing::error!(error = %e, "Stale quote cleanup failed"),
    }
}

/// Step a price by `basis_points` (±1% at the extremes), rounded to cents
/// and floored at one cent.
fn step_price(previous: Decimal, basis_points: i64) -> Decimal {
    let delta = Decimal::new(basis_points, 4);
    let stepped = (previous * (Decimal::ONE + delta)).round_dp(2);
    let floor = Decimal::new(1, 2);
    if stepped < floor {
        floor
    } else {
        stepped
    }
}

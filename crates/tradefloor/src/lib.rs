//! Tradefloor - autonomous trading floor simulation
//!
//! A crew of LLM-backed traders runs on a schedule against a crash-safe
//! SQLite ledger, with prices served from a quote store kept warm by the
//! `tradefloor-feed` daemon.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use tradefloor::models::{AppConfig, TradeInstruction};
//! use tradefloor::agents::{TradingFloor, DecisionEngine};
//! use tradefloor::ledger::Ledger;
//! ```

pub use tradefloor_agents as agents;
pub use tradefloor_ledger as ledger;
pub use tradefloor_market as market;
pub use tradefloor_models as models;

use std::sync::Arc;
use std::time::Duration;

use tradefloor_agents::floor::FloorOptions;
use tradefloor_agents::{ClaudeEngine, TraderContext, TradingFloor};
use tradefloor_ledger::{ActivityLog, Ledger, LedgerStore};
use tradefloor_market::{NyseCalendar, QuoteReader};
use tradefloor_models::AppConfig;

/// Build a TradingFloor from configuration. Fails fast on an unreachable
/// ledger or quote store.
pub fn build_floor(config: &AppConfig) -> Result<Arc<TradingFloor>, anyhow::Error> {
    let engine_timeout = Duration::from_secs(config.floor.engine_timeout_seconds);

    let store = LedgerStore::open(&config.store.sqlite_path)?;
    let activity = Arc::new(ActivityLog::open(&config.store.sqlite_path)?);
    let quotes = Arc::new(QuoteReader::open(&config.market.quotes_path)?);

    let ledger = Arc::new(Ledger::new(
        store,
        quotes,
        Arc::clone(&activity),
        config.floor.starting_balance,
        config.store.report_cache_capacity,
        Duration::from_secs(config.store.report_cache_ttl_seconds),
    ));

    let traders: Vec<Arc<TraderContext>> = config
        .floor
        .traders
        .iter()
        .map(|t| {
            let model = t
                .model
                .clone()
                .unwrap_or_else(|| config.floor.default_model.clone());
            let engine = Arc::new(ClaudeEngine::new(model, engine_timeout));
            Arc::new(TraderContext::new(
                t.name.clone(),
                t.strategy.clone(),
                engine,
            ))
        })
        .collect();

    let options = FloorOptions {
        force_open: config.market.force_open,
        tick_interval: Duration::from_secs(config.floor.interval_minutes * 60),
        engine_timeout,
    };

    Ok(Arc::new(TradingFloor::new(
        ledger,
        activity,
        Arc::new(NyseCalendar),
        traders,
        options,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradefloor_market::QuoteWriter;

    #[test]
    fn build_floor_wires_every_configured_trader() {
        let dir = tempfile::tempdir().unwrap();
        let ledger_path = dir.path().join("floor.db");
        let quotes_path = dir.path().join("quotes.db");
        // The quote store must exist before the read-only open.
        QuoteWriter::open(quotes_path.to_str().unwrap()).unwrap();

        let mut config = AppConfig::default();
        config.store.sqlite_path = ledger_path.to_str().unwrap().to_string();
        config.market.quotes_path = quotes_path.to_str().unwrap().to_string();

        let floor = build_floor(&config).unwrap();
        assert_eq!(floor.traders().len(), config.floor.traders.len());
    }

    #[test]
    fn build_floor_fails_without_a_quote_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.store.sqlite_path = dir.path().join("floor.db").to_str().unwrap().to_string();
        config.market.quotes_path = dir.path().join("missing.db").to_str().unwrap().to_string();

        assert!(build_floor(&config).is_err());
    }
}

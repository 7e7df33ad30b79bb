use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Top-level configuration for the trading floor host process.
/// Loaded once at startup; there is no hot reload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub market: MarketConfig,
    pub floor: FloorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            market: MarketConfig::default(),
            floor: FloorConfig::default(),
        }
    }
}

/// Configuration for the ledger's persisted store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Path to the ledger SQLite file (accounts, transactions, snapshots, logs).
    pub sqlite_path: String,
    /// Maximum number of account report views kept in the in-memory cache.
    #[serde(default = "default_report_capacity")]
    pub report_cache_capacity: u64,
    /// TTL in seconds for cached report views.
    #[serde(default = "default_report_ttl")]
    pub report_cache_ttl_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sqlite_path: "data/tradefloor.db".to_string(),
            report_cache_capacity: default_report_capacity(),
            report_cache_ttl_seconds: default_report_ttl(),
        }
    }
}

/// Configuration for the price/calendar gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketConfig {
    /// Path to the quote board SQLite file written by the feed daemon.
    pub quotes_path: String,
    /// Run ticks even when the market calendar says closed.
    #[serde(default)]
    pub force_open: bool,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            quotes_path: "data/quotes.db".to_string(),
            force_open: false,
        }
    }
}

/// Configuration for the orchestrator and its traders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FloorConfig {
    /// Minutes between ticks in continuous mode.
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
    /// Cash balance given to every newly created account.
    #[serde(default = "default_starting_balance")]
    pub starting_balance: Decimal,
    /// Hard bound on one decision-engine call, in seconds.
    #[serde(default = "default_engine_timeout")]
    pub engine_timeout_seconds: u64,
    /// Default model for traders that don't specify one.
    #[serde(default = "default_model")]
    pub default_model: String,
    /// The traders on the floor.
    pub traders: Vec<TraderConfig>,
}

impl Default for FloorConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
            starting_balance: default_starting_balance(),
            engine_timeout_seconds: default_engine_timeout(),
            default_model: default_model(),
            traders: vec![
                TraderConfig {
                    name: "Warren".to_string(),
                    strategy: "Patient value investor. Buy quality businesses below \
                               intrinsic value and hold; sell only when the thesis breaks."
                        .to_string(),
                    model: None,
                },
                TraderConfig {
                    name: "George".to_string(),
                    strategy: "Bold macro trader. Take large contrarian positions when \
                               market consensus looks wrong; cut losers fast."
                        .to_string(),
                    model: None,
                },
                TraderConfig {
                    name: "Ray".to_string(),
                    strategy: "Systematic allocator. Keep a diversified all-weather book \
                               and rebalance toward target weights."
                        .to_string(),
                    model: None,
                },
                TraderConfig {
                    name: "Cathie".to_string(),
                    strategy: "High-conviction growth. Concentrate in disruptive \
                               innovation and add on weakness."
                        .to_string(),
                    model: None,
                },
            ],
        }
    }
}

/// A single trader: name (the account key), strategy descriptor, and an
/// optional model override for its decision engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraderConfig {
    pub name: String,
    /// Opaque strategy text, fixed at account creation.
    pub strategy: String,
    /// Falls back to `FloorConfig::default_model`.
    pub model: Option<String>,
}

fn default_report_capacity() -> u64 {
    1_000
}
fn default_report_ttl() -> u64 {
    30
}
fn default_interval_minutes() -> u64 {
    60
}
fn default_starting_balance() -> Decimal {
    Decimal::new(10_000, 0)
}
fn default_engine_timeout() -> u64 {
    120
}
fn default_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn default_config_has_four_traders() {
        let config = AppConfig::default();
        assert_eq!(config.floor.traders.len(), 4);
        assert_eq!(config.floor.starting_balance, dec!(10000));
        assert!(!config.market.force_open);
    }

    #[test]
    fn roundtrip_app_config() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn config_from_toml() {
        let toml_str = r#"
[store]
sqlite_path = "/tmp/floor.db"
report_cache_capacity = 100
report_cache_ttl_seconds = 10

[market]
quotes_path = "/tmp/quotes.db"
force_open = true

[floor]
interval_minutes = 15
starting_balance = "5000"
engine_timeout_seconds = 60
default_model = "claude-3-5-haiku-latest"

[[floor.traders]]
name = "Warren"
strategy = "Value"

[[floor.traders]]
name = "Cathie"
strategy = "Growth"
model = "claude-sonnet-4-5-20250929"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.store.sqlite_path, "/tmp/floor.db");
        assert!(config.market.force_open);
        assert_eq!(config.floor.interval_minutes, 15);
        assert_eq!(config.floor.starting_balance, dec!(5000));
        assert_eq!(config.floor.traders.len(), 2);
        assert_eq!(
            config.floor.traders[1].model.as_deref(),
            Some("claude-sonnet-4-5-20250929")
        );
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let toml_str = r#"
[store]
sqlite_path = "floor.db"

[market]
quotes_path = "quotes.db"

[floor]
traders = []
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.floor.interval_minutes, 60);
        assert_eq!(config.floor.starting_balance, dec!(10000));
        assert_eq!(config.floor.engine_timeout_seconds, 120);
        assert_eq!(config.store.report_cache_ttl_seconds, 30);
        assert!(!config.market.force_open);
    }
}

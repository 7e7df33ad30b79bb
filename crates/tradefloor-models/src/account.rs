use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Symbol -> quantity held. Quantities are always strictly positive;
/// a symbol that reaches zero is removed from the map entirely.
pub type Holdings = BTreeMap<String, Decimal>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }

    pub fn parse(s: &str) -> Option<Side> {
        match s {
            "buy" => Some(Side::Buy),
            "sell" => Some(Side::Sell),
            _ => None,
        }
    }
}

/// An executed trade, recorded exactly once per successful buy/sell.
/// Immutable after insertion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionRecord {
    /// SQLite rowid, assigned on insert.
    pub id: i64,
    pub account: String,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub side: Side,
    /// Free-text justification from the decision engine, if it gave one.
    pub rationale: Option<String>,
}

/// One sample in an account's portfolio value time series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioPoint {
    pub timestamp: DateTime<Utc>,
    pub total_value: Decimal,
}

/// A consistent point-in-time view of an account, as handed to the
/// decision engine and the dashboard. Deliberately excludes the value
/// time series to keep the engine payload small.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountReport {
    pub name: String,
    pub balance: Decimal,
    pub holdings: Holdings,
    pub strategy: String,
    pub recent_transactions: Vec<TransactionRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_report() -> AccountReport {
        let mut holdings = Holdings::new();
        holdings.insert("AAPL".to_string(), dec!(5));
        AccountReport {
            name: "Warren".to_string(),
            balance: dec!(9250.00),
            holdings,
            strategy: "Value investing with a long horizon".to_string(),
            recent_transactions: vec![TransactionRecord {
                id: 1,
                account: "Warren".to_string(),
                timestamp: Utc::now(),
                symbol: "AAPL".to_string(),
                quantity: dec!(5),
                price: dec!(150.00),
                side: Side::Buy,
                rationale: Some("Trading below intrinsic value".to_string()),
            }],
        }
    }

    #[test]
    fn roundtrip_account_report() {
        let report = sample_report();
        let json = serde_json::to_string(&report).unwrap();
        let deserialized: AccountReport = serde_json::from_str(&json).unwrap();
        assert_eq!(report, deserialized);
    }

    #[test]
    fn side_serialization() {
        assert_eq!(serde_json::to_string(&Side::Buy).unwrap(), "\"buy\"");
        assert_eq!(serde_json::to_string(&Side::Sell).unwrap(), "\"sell\"");
    }

    #[test]
    fn side_parse() {
        assert_eq!(Side::parse("buy"), Some(Side::Buy));
        assert_eq!(Side::parse("sell"), Some(Side::Sell));
        assert_eq!(Side::parse("hold"), None);
    }

    #[test]
    fn decimal_serializes_as_string() {
        // serde-with-str is enabled workspace-wide; balances must survive
        // a JSON round trip without float truncation.
        let report = sample_report();
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"9250.00\""));
    }
}

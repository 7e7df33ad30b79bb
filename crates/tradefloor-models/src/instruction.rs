use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::{AccountReport, Side};

/// A trader's posture for one tick. Alternates every tick, success or not,
/// so a transient engine failure can never wedge a trader in one posture.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Look for new positions.
    Trade,
    /// Adjust existing positions.
    Rebalance,
}

impl Mode {
    pub fn toggled(self) -> Mode {
        match self {
            Mode::Trade => Mode::Rebalance,
            Mode::Rebalance => Mode::Trade,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Trade => "trade",
            Mode::Rebalance => "rebalance",
        }
    }
}

/// A single buy/sell directive returned by the decision engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeInstruction {
    pub symbol: String,
    pub quantity: Decimal,
    pub side: Side,
    #[serde(default)]
    pub rationale: Option<String>,
}

/// Everything the decision engine gets for one cycle (serialized as JSON).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionRequest {
    pub request_id: Uuid,
    pub trader: String,
    pub strategy: String,
    pub mode: Mode,
    pub account: AccountReport,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Holdings;
    use rust_decimal_macros::dec;

    #[test]
    fn mode_toggles_both_ways() {
        assert_eq!(Mode::Trade.toggled(), Mode::Rebalance);
        assert_eq!(Mode::Rebalance.toggled(), Mode::Trade);
    }

    #[test]
    fn mode_serialization() {
        assert_eq!(serde_json::to_string(&Mode::Trade).unwrap(), "\"trade\"");
        assert_eq!(
            serde_json::to_string(&Mode::Rebalance).unwrap(),
            "\"rebalance\""
        );
    }

    #[test]
    fn roundtrip_instruction_with_rationale() {
        let instruction = TradeInstruction {
            symbol: "TSLA".to_string(),
            quantity: dec!(10),
            side: Side::Buy,
            rationale: Some("Momentum breakout".to_string()),
        };
        let json = serde_json::to_string(&instruction).unwrap();
        let deserialized: TradeInstruction = serde_json::from_str(&json).unwrap();
        assert_eq!(instruction, deserialized);
    }

    #[test]
    fn instruction_rationale_defaults_to_none() {
        let json = r#"{"symbol": "SPY", "quantity": "2", "side": "sell"}"#;
        let instruction: TradeInstruction = serde_json::from_str(json).unwrap();
        assert_eq!(instruction.rationale, None);
        assert_eq!(instruction.quantity, dec!(2));
    }

    #[test]
    fn roundtrip_decision_request() {
        let request = DecisionRequest {
            request_id: Uuid::new_v4(),
            trader: "Cathie".to_string(),
            strategy: "High-conviction growth".to_string(),
            mode: Mode::Rebalance,
            account: AccountReport {
                name: "Cathie".to_string(),
                balance: dec!(10000),
                holdings: Holdings::new(),
                strategy: "High-conviction growth".to_string(),
                recent_transactions: vec![],
            },
        };
        let json = serde_json::to_string(&request).unwrap();
        let deserialized: DecisionRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(request, deserialized);
    }
}

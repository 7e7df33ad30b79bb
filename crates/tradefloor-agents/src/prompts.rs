use tradefloor_models::{DecisionRequest, Mode};

/// Schema description included in every trader system prompt.
fn instruction_schema() -> String {
    let example = serde_json::json!({
        "instructions": [
            {
                "symbol": "<ticker>",
                "quantity": "<decimal string, positive>",
                "side": "buy | sell",
                "rationale": "<one sentence on why>"
            }
        ]
    });
    serde_json::to_string_pretty(&example).unwrap_or_default()
}

/// The persona prompt for one trader. The strategy descriptor comes from
/// configuration and is quoted verbatim.
pub fn trader_system_prompt(name: &str, strategy: &str) -> String {
    format!(
        "You are {name}, a trader managing a simulated portfolio on an \
         autonomous trading floor. Your investment strategy:\n\n{strategy}\n\n\
         You will receive your current account as JSON: cash balance, \
         holdings (symbol -> quantity), and your most recent transactions. \
         Prices are resolved by the ledger at execution time; you do not \
         choose prices.\n\n\
         Rules:\n\
         - You can only spend cash you have; oversized buys are rejected.\n\
         - You can only sell shares you hold; oversized sells are rejected.\n\
         - Quantities must be positive decimal strings (fractional is fine).\n\
         - Doing nothing is a valid decision: return an empty instructions list.\n\n\
         You MUST respond with ONLY a JSON object matching this schema:\n\
         {}\n\n\
         All decimal values MUST be quoted strings (e.g., \"2.5\" not 2.5).\n\
         Respond with ONLY the JSON object, no other text.",
        instruction_schema()
    )
}

fn trade_message() -> &'static str {
    "Posture for this cycle: TRADE. Survey the market for new opportunities \
     that fit your strategy and open or add to positions accordingly."
}

fn rebalance_message() -> &'static str {
    "Posture for this cycle: REBALANCE. Re-examine your existing holdings \
     against your strategy; trim, exit, or rotate positions. Avoid opening \
     speculative new positions this cycle."
}

/// The user prompt for one decision cycle: posture directive plus the
/// serialized account snapshot.
pub fn decision_message(request: &DecisionRequest) -> Result<String, serde_json::Error> {
    let posture = match request.mode {
        Mode::Trade => trade_message(),
        Mode::Rebalance => rebalance_message(),
    };
    let account = serde_json::to_string_pretty(&request.account)?;
    Ok(format!("{posture}\n\nYour account:\n{account}"))
}

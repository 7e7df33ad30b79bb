use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};
use tradefloor_models::{DecisionRequest, TradeInstruction};

use crate::error::EngineError;
use crate::parser::parse_instructions;
use crate::prompts::{decision_message, trader_system_prompt};

/// The decision boundary. Mockable for testing the floor without a model.
#[async_trait]
pub trait DecisionEngine: Send + Sync {
    fn name(&self) -> &str;

    async fn decide(&self, request: &DecisionRequest) -> Result<Vec<TradeInstruction>, EngineError>;
}

/// Asks the `claude` CLI to act as the trader. The request's persona and
/// strategy become the system prompt, its portfolio becomes the message,
/// and the reply is parsed back into trade instructions.
pub struct ClaudeEngine {
    model: String,
    timeout: Duration,
}

impl ClaudeEngine {
    pub fn new(model: String, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    /// Whether the `claude` binary answers at all.
    pub async fn cli_available() -> bool {
        matches!(
            Command::new("claude").arg("--version").output().await,
            Ok(output) if output.status.success()
        )
    }

    async fn ask(&self, persona: &str, message: &str) -> Result<String, EngineError> {
        debug!(model = %self.model, "Asking claude for a decision");

        let run = Command::new("claude")
            .args(cli_args(persona, message, &self.model))
            .output();
        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| EngineError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| EngineError::Cli(format!("could not spawn claude: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, stderr = %stderr, "claude CLI failed");
            return Err(EngineError::Cli(format!(
                "claude exited {}: {stderr}",
                output.status
            )));
        }

        let reply = String::from_utf8_lossy(&output.stdout).into_owned();
        if reply.trim().is_empty() {
            return Err(EngineError::Cli("claude replied with nothing".to_string()));
        }
        Ok(reply)
    }
}

fn cli_args<'a>(persona: &'a str, message: &'a str, model: &'a str) -> [&'a str; 8] {
    [
        "-p",
        message,
        "--system-prompt",
        persona,
        "--model",
        model,
        "--output-format",
        "text",
    ]
}

#[async_trait]
impl DecisionEngine for ClaudeEngine {
    fn name(&self) -> &str {
        "claude"
    }

    async fn decide(
        &self,
        request: &DecisionRequest,
    ) -> Result<Vec<TradeInstruction>, EngineError> {
        let persona = trader_system_prompt(&request.trader, &request.strategy);
        let message = decision_message(request)?;
        let reply = self.ask(&persona, &message).await?;
        parse_instructions(&reply)
    }
}

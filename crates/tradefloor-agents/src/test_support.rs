//! Test support engines for exercising the floor without a model.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tradefloor_models::{DecisionRequest, TradeInstruction};

use crate::engine::DecisionEngine;
use crate::error::EngineError;

/// Returns the same scripted instruction list on every call and records
/// each request it sees, so tests can assert on posture alternation.
pub struct ScriptedEngine {
    instructions: Vec<TradeInstruction>,
    requests: Mutex<Vec<DecisionRequest>>,
}

impl ScriptedEngine {
    pub fn new(instructions: Vec<TradeInstruction>) -> Self {
        Self {
            instructions,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// An engine that always holds: decides, but never trades.
    pub fn holding() -> Self {
        Self::new(Vec::new())
    }

    pub fn seen_requests(&self) -> Vec<DecisionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl DecisionEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn decide(
        &self,
        request: &DecisionRequest,
    ) -> Result<Vec<TradeInstruction>, EngineError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());
        Ok(self.instructions.clone())
    }
}

/// Always fails, for exercising failure isolation.
pub struct FailingEngine;

#[async_trait]
impl DecisionEngine for FailingEngine {
    fn name(&self) -> &str {
        "failing"
    }

    async fn decide(
        &self,
        _request: &DecisionRequest,
    ) -> Result<Vec<TradeInstruction>, EngineError> {
        Err(EngineError::Cli("scripted failure".to_string()))
    }
}

/// Panics mid-decision, for exercising the floor's task-failure handling.
pub struct PanickingEngine;

#[async_trait]
impl DecisionEngine for PanickingEngine {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn decide(
        &self,
        _request: &DecisionRequest,
    ) -> Result<Vec<TradeInstruction>, EngineError> {
        panic!("scripted panic");
    }
}

/// Sleeps past any reasonable deadline, for exercising the timeout bound.
pub struct SlowEngine {
    pub delay: Duration,
}

#[async_trait]
impl DecisionEngine for SlowEngine {
    fn name(&self) -> &str {
        "slow"
    }

    async fn decide(
        &self,
        _request: &DecisionRequest,
    ) -> Result<Vec<TradeInstruction>, EngineError> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }
}

use std::sync::{Arc, Mutex};

use tradefloor_models::Mode;

use crate::engine::DecisionEngine;

/// Where a trader is in its run lifecycle. A run passes Idle -> Running
/// -> Succeeded/Failed and settles back at Idle when the tick completes;
/// the terminal outcome stays readable through `last_outcome`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// One trader on the floor: a persona, its engine, and the posture/state
/// that alternates across ticks.
pub struct TraderContext {
    pub name: String,
    pub strategy: String,
    engine: Arc<dyn DecisionEngine>,
    mode: Mutex<Mode>,
    state: Mutex<RunState>,
    last_outcome: Mutex<Option<RunState>>,
}

impl TraderContext {
    pub fn new(name: String, strategy: String, engine: Arc<dyn DecisionEngine>) -> Self {
        Self {
            name,
            strategy,
            engine,
            mode: Mutex::new(Mode::Trade),
            state: Mutex::new(RunState::Idle),
            last_outcome: Mutex::new(None),
        }
    }

    pub fn engine(&self) -> Arc<dyn DecisionEngine> {
        Arc::clone(&self.engine)
    }

    pub fn mode(&self) -> Mode {
        *self.mode.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> RunState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// `Succeeded` or `Failed` from the most recent completed run, `None`
    /// before the first one.
    pub fn last_outcome(&self) -> Option<RunState> {
        *self.last_outcome.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Mark the trader running and return the posture for this run.
    pub fn begin_run(&self) -> Mode {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = RunState::Running;
        self.mode()
    }

    /// Record the run outcome, return the trader to `Idle`, and toggle
    /// the posture. The toggle is unconditional so a failing engine can
    /// never wedge a trader in one posture.
    pub fn end_run(&self, succeeded: bool) {
        let outcome = if succeeded {
            RunState::Succeeded
        } else {
            RunState::Failed
        };
        *self.last_outcome.lock().unwrap_or_else(|e| e.into_inner()) = Some(outcome);
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = RunState::Idle;
        let mut mode = self.mode.lock().unwrap_or_else(|e| e.into_inner());
        *mode = mode.toggled();
    }
}

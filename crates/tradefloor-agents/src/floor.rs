use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use tradefloor_ledger::{ActivityLog, Ledger};
use tradefloor_market::MarketCalendar;
use tradefloor_models::{DecisionRequest, LogCategory, Side, TradeInstruction};

use crate::trader::{RunState, TraderContext};

/// Knobs for the tick loop.
#[derive(Debug, Clone)]
pub struct FloorOptions {
    /// Run ticks even when the market calendar says closed.
    pub force_open: bool,
    pub tick_interval: Duration,
    pub engine_timeout: Duration,
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    pub ran: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped_market_closed: bool,
}

impl TickSummary {
    fn skipped() -> Self {
        Self {
            ran: 0,
            succeeded: 0,
            failed: 0,
            skipped_market_closed: true,
        }
    }
}

/// The trading floor: a set of traders run concurrently against one
/// ledger, gated by the market calendar.
pub struct TradingFloor {
    ledger: Arc<Ledger>,
    activity: Arc<ActivityLog>,
    calendar: Arc<dyn MarketCalendar>,
    traders: Vec<Arc<TraderContext>>,
    options: FloorOptions,
}

impl TradingFloor {
    pub fn new(
        ledger: Arc<Ledger>,
        activity: Arc<ActivityLog>,
        calendar: Arc<dyn MarketCalendar>,
        traders: Vec<Arc<TraderContext>>,
        options: FloorOptions,
    ) -> Self {
        Self {
            ledger,
            activity,
            calendar,
            traders,
            options,
        }
    }

    pub fn traders(&self) -> &[Arc<TraderContext>] {
        &self.traders
    }

    /// Run every trader once, concurrently. One trader's failure (or
    /// panic) never touches its siblings; the tick always joins everyone
    /// before returning.
    pub async fn run_tick(&self) -> TickSummary {
        if !self.market_open() {
            info!("Market closed, skipping tick");
            return TickSummary::skipped();
        }

        let start = Instant::now();
        info!(traders = self.traders.len(), "Starting tick");

        let mut handles = Vec::new();
        for trader in &self.traders {
            let trader = Arc::clone(trader);
            let ledger = Arc::clone(&self.ledger);
            let activity = Arc::clone(&self.activity);
            let timeout = self.options.engine_timeout;

            handles.push(tokio::spawn(async move {
                run_trader(&ledger, &activity, &trader, timeout).await
            }));
        }

        let mut summary = TickSummary {
            ran: self.traders.len(),
            succeeded: 0,
            failed: 0,
            skipped_market_closed: false,
        };
        for (trader, handle) in self.traders.iter().zip(handles) {
            match handle.await {
                Ok(true) => summary.succeeded += 1,
                Ok(false) => summary.failed += 1,
                Err(e) => {
                    error!(trader = %trader.name, error = %e, "Trader task panicked");
                    // A panic skips the normal end-of-run path; close the
                    // run here so the trader is not wedged in Running.
                    if trader.state() == RunState::Running {
                        trader.end_run(false);
                    }
                    summary.failed += 1;
                }
            }
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            elapsed_ms = start.elapsed().as_millis(),
            "Tick complete"
        );
        summary
    }

    /// Tick immediately, then keep ticking at the configured interval
    /// until cancelled.
    pub async fn run_forever(&self, cancel: CancellationToken) {
        info!(
            interval_secs = self.options.tick_interval.as_secs(),
            "Trading floor started"
        );
        loop {
            self.run_tick().await;

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Trading floor shutting down");
                    return;
                }
                _ = tokio::time::sleep(self.options.tick_interval) => {}
            }
        }
    }

    // A calendar that cannot answer counts as closed.
    fn market_open(&self) -> bool {
        if self.options.force_open {
            return true;
        }
        match self.calendar.is_open(Utc::now()) {
            Ok(open) => open,
            Err(e) => {
                warn!(error = %e, "Calendar unavailable, treating market as closed");
                false
            }
        }
    }
}

/// One trader's run: decide under a deadline, apply what was decided,
/// record everything. Returns whether the run succeeded. The posture
/// toggle at the end is unconditional.
async fn run_trader(
    ledger: &Ledger,
    activity: &ActivityLog,
    trader: &TraderContext,
    timeout: Duration,
) -> bool {
    let mode = trader.begin_run();
    let succeeded = drive_run(ledger, activity, trader, timeout).await;
    trader.end_run(succeeded);

    if succeeded {
        activity.append(
            &trader.name,
            LogCategory::Agent,
            &format!("Run complete in {} mode", mode.as_str()),
        );
    }
    succeeded
}

async fn drive_run(
    ledger: &Ledger,
    activity: &ActivityLog,
    trader: &TraderContext,
    timeout: Duration,
) -> bool {
    let mode = trader.mode();
    let account = match ledger.get_or_create(&trader.name, &trader.strategy).await {
        Ok(account) => account,
        Err(e) => {
            error!(trader = %trader.name, error = %e, "Could not load account");
            activity.append(
                &trader.name,
                LogCategory::Trace,
                &format!("Run failed: account unavailable: {e}"),
            );
            return false;
        }
    };

    activity.append(
        &trader.name,
        LogCategory::Trace,
        &format!("Run started in {} mode", mode.as_str()),
    );

    let request = DecisionRequest {
        request_id: Uuid::new_v4(),
        trader: trader.name.clone(),
        strategy: trader.strategy.clone(),
        mode,
        account,
    };

    let engine = trader.engine();
    activity.append(
        &trader.name,
        LogCategory::Generation,
        &format!("Requesting decision from {} engine", engine.name()),
    );

    let instructions = match tokio::time::timeout(timeout, engine.decide(&request)).await {
        Ok(Ok(instructions)) => instructions,
        Ok(Err(e)) => {
            warn!(trader = %trader.name, error = %e, "Decision engine failed");
            activity.append(
                &trader.name,
                LogCategory::Trace,
                &format!("Run failed: {e}"),
            );
            return false;
        }
        Err(_) => {
            warn!(
                trader = %trader.name,
                timeout_secs = timeout.as_secs(),
                "Decision engine timed out"
            );
            activity.append(
                &trader.name,
                LogCategory::Trace,
                &format!("Run failed: engine timed out after {}s", timeout.as_secs()),
            );
            return false;
        }
    };

    activity.append(
        &trader.name,
        LogCategory::Response,
        &format!("Engine returned {} instruction(s)", instructions.len()),
    );

    let total = instructions.len();
    let mut applied = 0;
    for instruction in instructions {
        if apply_instruction(ledger, activity, &trader.name, instruction).await {
            applied += 1;
        }
    }
    info!(trader = %trader.name, applied, total, "Instructions applied");

    // Revalue at end of run so the series gets a sample even on hold.
    if let Err(e) = ledger.snapshot(&trader.name).await {
        warn!(trader = %trader.name, error = %e, "Post-run snapshot failed");
    }

    true
}

/// A rejected instruction is logged and skipped; later instructions in
/// the same run still execute.
async fn apply_instruction(
    ledger: &Ledger,
    activity: &ActivityLog,
    name: &str,
    instruction: TradeInstruction,
) -> bool {
    let TradeInstruction {
        symbol,
        quantity,
        side,
        rationale,
    } = instruction;

    let result = match side {
        Side::Buy => ledger.buy(name, &symbol, quantity, rationale).await,
        Side::Sell => ledger.sell(name, &symbol, quantity, rationale).await,
    };

    match result {
        Ok(_) => true,
        Err(e) => {
            if e.is_rejection() {
                warn!(trader = %name, side = side.as_str(), %symbol, %quantity, error = %e, "Instruction rejected");
            } else {
                error!(trader = %name, side = side.as_str(), %symbol, %quantity, error = %e, "Instruction failed");
            }
            activity.append(
                name,
                LogCategory::Error,
                &format!("Rejected {} {} {}: {e}", side.as_str(), quantity, symbol),
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use rust_decimal_macros::dec;
    use tradefloor_ledger::LedgerStore;
    use tradefloor_market::test_support::StaticPrices;
    use tradefloor_market::{AlwaysOpen, MarketError};
    use tradefloor_models::Mode;

    struct AlwaysClosed;

    impl MarketCalendar for AlwaysClosed {
        fn is_open(&self, _now: DateTime<Utc>) -> Result<bool, MarketError> {
            Ok(false)
        }
    }

    struct BrokenCalendar;

    impl MarketCalendar for BrokenCalendar {
        fn is_open(&self, _now: DateTime<Utc>) -> Result<bool, MarketError> {
            Err(MarketError::CalendarUnavailable("no tables".to_string()))
        }
    }

    fn test_ledger(activity: Arc<ActivityLog>) -> Arc<Ledger> {
        Arc::new(Ledger::new(
            LedgerStore::open_in_memory().unwrap(),
            Arc::new(StaticPrices::new([("AAA", dec!(100))])),
            activity,
            dec!(1000),
            100,
            Duration::from_secs(60),
        ))
    }

    fn options() -> FloorOptions {
        FloorOptions {
            force_open: false,
            tick_interval: Duration::from_secs(60),
            engine_timeout: Duration::from_secs(5),
        }
    }

    fn holding_trader(name: &str) -> Arc<TraderContext> {
        Arc::new(TraderContext::new(
            name.to_string(),
            "hold".to_string(),
            Arc::new(crate::test_support::ScriptedEngine::holding()),
        ))
    }

    #[tokio::test]
    async fn closed_market_skips_the_tick() {
        let activity = Arc::new(ActivityLog::open_in_memory().unwrap());
        let floor = TradingFloor::new(
            test_ledger(activity.clone()),
            activity,
            Arc::new(AlwaysClosed),
            vec![holding_trader("Warren")],
            options(),
        );

        let summary = floor.run_tick().await;
        assert!(summary.skipped_market_closed);
        assert_eq!(summary.ran, 0);
        // The trader was never touched.
        assert_eq!(floor.traders()[0].mode(), Mode::Trade);
    }

    #[tokio::test]
    async fn broken_calendar_counts_as_closed() {
        let activity = Arc::new(ActivityLog::open_in_memory().unwrap());
        let floor = TradingFloor::new(
            test_ledger(activity.clone()),
            activity,
            Arc::new(BrokenCalendar),
            vec![holding_trader("Warren")],
            options(),
        );

        let summary = floor.run_tick().await;
        assert!(summary.skipped_market_closed);
    }

    #[tokio::test]
    async fn force_open_overrides_the_calendar() {
        let activity = Arc::new(ActivityLog::open_in_memory().unwrap());
        let floor = TradingFloor::new(
            test_ledger(activity.clone()),
            activity,
            Arc::new(AlwaysClosed),
            vec![holding_trader("Warren")],
            FloorOptions {
                force_open: true,
                ..options()
            },
        );

        let summary = floor.run_tick().await;
        assert!(!summary.skipped_market_closed);
        assert_eq!(summary.succeeded, 1);
    }

    #[tokio::test]
    async fn tick_creates_accounts_and_toggles_mode() {
        let activity = Arc::new(ActivityLog::open_in_memory().unwrap());
        let ledger = test_ledger(activity.clone());
        let floor = TradingFloor::new(
            ledger.clone(),
            activity,
            Arc::new(AlwaysOpen),
            vec![holding_trader("Warren"), holding_trader("George")],
            options(),
        );

        let summary = floor.run_tick().await;
        assert_eq!(summary.succeeded, 2);

        for trader in floor.traders() {
            assert_eq!(trader.mode(), Mode::Rebalance);
            let report = ledger.report(&trader.name).await.unwrap();
            assert_eq!(report.balance, dec!(1000));
        }
    }

    #[tokio::test]
    async fn traders_are_idle_again_after_the_tick() {
        let activity = Arc::new(ActivityLog::open_in_memory().unwrap());
        let floor = TradingFloor::new(
            test_ledger(activity.clone()),
            activity,
            Arc::new(AlwaysOpen),
            vec![holding_trader("Warren")],
            options(),
        );

        floor.run_tick().await;

        let trader = &floor.traders()[0];
        assert_eq!(trader.state(), RunState::Idle);
        assert_eq!(trader.last_outcome(), Some(RunState::Succeeded));
    }

    #[tokio::test]
    async fn panicking_engine_does_not_wedge_the_trader() {
        let activity = Arc::new(ActivityLog::open_in_memory().unwrap());
        let floor = TradingFloor::new(
            test_ledger(activity.clone()),
            activity,
            Arc::new(AlwaysOpen),
            vec![Arc::new(TraderContext::new(
                "Cathie".to_string(),
                "moonshots".to_string(),
                Arc::new(crate::test_support::PanickingEngine),
            ))],
            options(),
        );

        let summary = floor.run_tick().await;
        assert_eq!(summary.failed, 1);

        // The run was closed out on the trader's behalf.
        let trader = &floor.traders()[0];
        assert_eq!(trader.state(), RunState::Idle);
        assert_eq!(trader.last_outcome(), Some(RunState::Failed));
        assert_eq!(trader.mode(), Mode::Rebalance);
    }
}

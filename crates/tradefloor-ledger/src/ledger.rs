use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use tradefloor_market::PriceSource;
use tradefloor_models::account::{
    AccountReport, Holdings, PortfolioPoint, Side, TransactionRecord,
};
use tradefloor_models::activity::LogCategory;

use crate::activity::ActivityLog;
use crate::error::LedgerError;
use crate::reports::ReportCache;
use crate::store::{AccountRow, LedgerStore, NewTransaction};

/// How many transactions a report view carries.
const RECENT_TXN_LIMIT: usize = 10;

/// The authoritative owner of account state.
///
/// Concurrency discipline:
/// - mutations to one account are serialized by that account's async lock;
/// - mutations to different accounts proceed independently;
/// - the SQLite connection sits behind a short `std::sync::Mutex` that is
///   never held across an await, so the store lock bounds every reader's
///   wait to one mutation's write;
/// - price resolution happens before the store lock is taken, never inside
///   it.
pub struct Ledger {
    store: StdMutex<LedgerStore>,
    locks: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    reports: ReportCache,
    prices: Arc<dyn PriceSource>,
    activity: Arc<ActivityLog>,
    starting_balance: Decimal,
}

impl Ledger {
    pub fn new(
        store: LedgerStore,
        prices: Arc<dyn PriceSource>,
        activity: Arc<ActivityLog>,
        starting_balance: Decimal,
        report_cache_capacity: u64,
        report_cache_ttl: Duration,
    ) -> Self {
        Self {
            store: StdMutex::new(store),
            locks: StdMutex::new(HashMap::new()),
            reports: ReportCache::new(report_cache_capacity, report_cache_ttl),
            prices,
            activity,
            starting_balance,
        }
    }

    /// Return the account, creating it with the configured starting
    /// balance and empty holdings if this is its first reference.
    /// Safe under concurrent first-use: exactly one creation wins.
    pub async fn get_or_create(
        &self,
        name: &str,
        strategy: &str,
    ) -> Result<AccountReport, LedgerError> {
        let lock = self.account_lock(name)?;
        let _guard = lock.lock().await;

        let created = self
            .with_store(|store| store.create_account_if_absent(name, self.starting_balance, strategy))?;
        if created {
            info!(account = name, balance = %self.starting_balance, "Account created");
            self.with_store(|store| {
                store.insert_snapshot(name, Utc::now(), self.starting_balance)
            })?;
            self.activity.append(
                name,
                LogCategory::Agent,
                &format!("Account opened with balance {}", self.starting_balance),
            );
        }
        drop(_guard);

        self.report(name).await
    }

    /// Buy `quantity` of `symbol` at the current price. Atomic: either the
    /// debit, holding increment, transaction, and snapshot all land, or
    /// the account is untouched.
    pub async fn buy(
        &self,
        name: &str,
        symbol: &str,
        quantity: Decimal,
        rationale: Option<String>,
    ) -> Result<TransactionRecord, LedgerError> {
        require_positive(quantity)?;
        let lock = self.account_lock(name)?;
        let _guard = lock.lock().await;

        let row = self.fetch_account(name)?;
        let price = self.prices.price(symbol).await?;
        let cost = checked_total(price, quantity)?;
        if cost > row.balance {
            return Err(LedgerError::InsufficientFunds {
                needed: cost,
                available: row.balance,
            });
        }

        let balance = row.balance - cost;
        let mut holdings = row.holdings;
        *holdings.entry(symbol.to_string()).or_insert(Decimal::ZERO) += quantity;

        // Value the whole book before writing anything; a missing price
        // for any held symbol fails the operation with no state change.
        let total = self.total_value(balance, &holdings, symbol, price).await?;

        self.settle(name, balance, holdings, symbol, quantity, price, Side::Buy, rationale, total)
            .await
    }

    /// Sell `quantity` of `symbol` at the current price. Removes the
    /// holding entirely when it reaches zero. Atomic like `buy`.
    pub async fn sell(
        &self,
        name: &str,
        symbol: &str,
        quantity: Decimal,
        rationale: Option<String>,
    ) -> Result<TransactionRecord, LedgerError> {
        require_positive(quantity)?;
        let lock = self.account_lock(name)?;
        let _guard = lock.lock().await;

        let row = self.fetch_account(name)?;
        let held = row.holdings.get(symbol).copied().unwrap_or(Decimal::ZERO);
        if held < quantity {
            return Err(LedgerError::InsufficientHoldings {
                symbol: symbol.to_string(),
                requested: quantity,
                held,
            });
        }

        let price = self.prices.price(symbol).await?;
        let balance = row.balance + checked_total(price, quantity)?;
        let mut holdings = row.holdings;
        let remaining = held - quantity;
        if remaining.is_zero() {
            holdings.remove(symbol);
        } else {
            holdings.insert(symbol.to_string(), remaining);
        }

        let total = self.total_value(balance, &holdings, symbol, price).await?;

        self.settle(name, balance, holdings, symbol, quantity, price, Side::Sell, rationale, total)
            .await
    }

    /// Revalue the account at live prices and append a snapshot. A price
    /// failure skips the sample (non-fatal) and logs it.
    pub async fn snapshot(&self, name: &str) -> Result<Option<PortfolioPoint>, LedgerError> {
        let lock = self.account_lock(name)?;
        let _guard = lock.lock().await;

        let row = self.fetch_account(name)?;
        let mut total = row.balance;
        for (symbol, held) in &row.holdings {
            match self.prices.price(symbol).await {
                Ok(price) => total += *held * price,
                Err(e) => {
                    warn!(account = name, symbol, error = %e, "Snapshot skipped");
                    self.activity.append(
                        name,
                        LogCategory::Error,
                        &format!("Snapshot skipped: {e}"),
                    );
                    return Ok(None);
                }
            }
        }

        let timestamp = Utc::now();
        self.with_store(|store| store.insert_snapshot(name, timestamp, total))?;
        debug!(account = name, total = %total, "Snapshot appended");
        Ok(Some(PortfolioPoint {
            timestamp,
            total_value: total,
        }))
    }

    /// A consistent point-in-time view of the account. Served from the
    /// report cache when warm; never takes the per-account write lock.
    pub async fn report(&self, name: &str) -> Result<AccountReport, LedgerError> {
        if let Some(report) = self.reports.get(name).await {
            return Ok(report);
        }

        let report = self.with_store(|store| {
            let row = store
                .account(name)?
                .ok_or_else(|| LedgerError::UnknownAccount(name.to_string()))?;
            let recent = store.recent_transactions(name, RECENT_TXN_LIMIT)?;
            Ok(AccountReport {
                name: row.name,
                balance: row.balance,
                holdings: row.holdings,
                strategy: row.strategy,
                recent_transactions: recent,
            })
        })?;

        self.reports.insert(name.to_string(), report.clone()).await;
        Ok(report)
    }

    /// The full portfolio value time series, for the dashboard.
    pub fn value_series(&self, name: &str) -> Result<Vec<PortfolioPoint>, LedgerError> {
        self.with_store(|store| store.value_series(name))
    }

    fn account_lock(&self, name: &str) -> Result<Arc<AsyncMutex<()>>, LedgerError> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|e| LedgerError::Unavailable(format!("lock map poisoned: {e}")))?;
        Ok(Arc::clone(
            locks
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        ))
    }

    fn with_store<T>(
        &self,
        f: impl FnOnce(&mut LedgerStore) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let mut store = self
            .store
            .lock()
            .map_err(|e| LedgerError::Unavailable(format!("store mutex poisoned: {e}")))?;
        f(&mut store)
    }

    fn fetch_account(&self, name: &str) -> Result<AccountRow, LedgerError> {
        self.with_store(|store| store.account(name))?
            .ok_or_else(|| LedgerError::UnknownAccount(name.to_string()))
    }

    /// Balance plus the value of every holding at current prices. The
    /// traded symbol reuses the already-resolved execution price.
    async fn total_value(
        &self,
        balance: Decimal,
        holdings: &Holdings,
        traded_symbol: &str,
        traded_price: Decimal,
    ) -> Result<Decimal, LedgerError> {
        let mut total = balance;
        for (symbol, held) in holdings {
            let price = if symbol == traded_symbol {
                traded_price
            } else {
                self.prices.price(symbol).await?
            };
            total += *held * price;
        }
        Ok(total)
    }

    #[allow(clippy::too_many_arguments)]
    async fn settle(
        &self,
        name: &str,
        balance: Decimal,
        holdings: Holdings,
        symbol: &str,
        quantity: Decimal,
        price: Decimal,
        side: Side,
        rationale: Option<String>,
        total: Decimal,
    ) -> Result<TransactionRecord, LedgerError> {
        let txn = NewTransaction {
            timestamp: Utc::now(),
            symbol: symbol.to_string(),
            quantity,
            price,
            side,
            rationale,
        };
        let id =
            self.with_store(|store| store.apply_trade(name, balance, &holdings, &txn, total))?;
        self.reports.invalidate(name).await;

        info!(
            account = name,
            side = side.as_str(),
            symbol,
            quantity = %quantity,
            price = %price,
            balance = %balance,
            "Trade settled"
        );
        self.activity.append(
            name,
            LogCategory::Function,
            &format!("Executed {} {} {} @ {}", side.as_str(), quantity, symbol, price),
        );

        Ok(TransactionRecord {
            id,
            account: name.to_string(),
            timestamp: txn.timestamp,
            symbol: txn.symbol,
            quantity,
            price,
            side,
            rationale: txn.rationale,
        })
    }
}

fn require_positive(quantity: Decimal) -> Result<(), LedgerError> {
    if quantity <= Decimal::ZERO {
        return Err(LedgerError::InvalidArgument(format!(
            "quantity must be positive, got {quantity}"
        )));
    }
    Ok(())
}

// An engine can ask for any quantity it likes; an overflowing total is a
// rejection, not a panic.
fn checked_total(price: Decimal, quantity: Decimal) -> Result<Decimal, LedgerError> {
    price.checked_mul(quantity).ok_or_else(|| {
        LedgerError::InvalidArgument(format!(
            "trade value overflows: {quantity} at {price}"
        ))
    })
}

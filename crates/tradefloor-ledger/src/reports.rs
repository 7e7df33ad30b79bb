use std::time::Duration;

use moka::future::Cache;
use tradefloor_models::account::AccountReport;

/// In-memory cache of account report views, backed by moka.
///
/// Reports are rebuilt from SQLite on a miss and invalidated whenever the
/// account mutates, so dashboard and decision-engine reads stay off the
/// writers' critical path without ever observing a torn account.
pub struct ReportCache {
    inner: Cache<String, AccountReport>,
}

impl ReportCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, name: &str) -> Option<AccountReport> {
        self.inner.get(name).await
    }

    pub async fn insert(&self, name: String, report: AccountReport) {
        self.inner.insert(name, report).await;
    }

    pub async fn invalidate(&self, name: &str) {
        self.inner.invalidate(name).await;
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

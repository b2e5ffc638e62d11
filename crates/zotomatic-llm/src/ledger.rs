use std::sync::Arc;

use chrono::Local;
use zotomatic_storage::StateStore;

/// Daily call-count budget shared by every provider (`spec.md` §4.5).
///
/// Usage is keyed `llm_usage.<YYYY-MM-DD>` in the state store's `meta`
/// table so a restart doesn't reset or double the day's count, and the
/// check-then-increment happens inside one SQLite transaction
/// ([`StateStore::try_add_meta_counter_capped`]) so concurrent callers can't
/// both reserve the last unit of quota.
pub struct UsageLedger {
    store: Arc<StateStore>,
    daily_limit: i64,
}

impl UsageLedger {
    pub fn new(store: Arc<StateStore>, daily_limit: i64) -> Self {
        Self { store, daily_limit }
    }

    pub fn daily_limit(&self) -> i64 {
        self.daily_limit
    }

    fn today_key() -> String {
        format!("llm_usage.{}", Local::now().format("%Y-%m-%d"))
    }

    /// Attempts to reserve `n` calls against today's quota. A `daily_limit`
    /// of zero or less means unlimited. Returns `true` if the reservation
    /// succeeded (the caller may proceed), `false` otherwise.
    pub fn try_reserve(&self, n: i64) -> Result<bool, zotomatic_storage::StorageError> {
        self.store
            .try_add_meta_counter_capped(&Self::today_key(), n, self.daily_limit)
    }

    /// Total calls already reserved today.
    pub fn get_total_used(&self) -> Result<i64, zotomatic_storage::StorageError> {
        Ok(self
            .store
            .get_meta(&Self::today_key())?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0))
    }
}

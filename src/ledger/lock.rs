//! Per-currency mutual exclusion inside one process.

use crate::core::currency::CurrencyCode;
use crate::ledger::error::{LedgerError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// One lock per currency, created on first use.
///
/// Transactions on different currencies never wait for each other.
#[derive(Debug, Default)]
pub struct LockTable {
    locks: Mutex<HashMap<CurrencyCode, Arc<Mutex<()>>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, currency: &CurrencyCode) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .entry(currency.clone())
            .or_default()
            .clone()
    }

    /// Run `f` while holding the lock for `currency`.
    ///
    /// Fails with [`LedgerError::LockTimeout`] if the lock is not free
    /// within `timeout`. The lock is released when `f` returns, whether it
    /// succeeded or not.
    pub fn with_lock<T, F>(&self, currency: &CurrencyCode, timeout: Duration, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let lock = self.lock_for(currency);
        let Some(_guard) = lock.try_lock_for(timeout) else {
            log::warn!("{}: lock not acquired within {:?}", currency, timeout);
            return Err(LedgerError::LockTimeout {
                currency: currency.clone(),
                waited: timeout,
            });
        };
        f()
    }
}

use crate::core::currency::CurrencyCode;
use crate::core::stock::StockLevels;
use crate::ledger::error::Result;
use crate::ledger::lock::LockTable;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

/// Durable backing for the stock ledger.
///
/// A store keeps one [`StockLevels`] record per currency and offers three
/// things: read the current record, replace it atomically, and hold it
/// exclusively for the duration of a read-modify-write.
pub trait LedgerStore: Send + Sync {
    /// Current record for `currency`, or `None` if none was ever written.
    fn read(&self, currency: &CurrencyCode) -> Result<Option<StockLevels>>;

    /// Replace the record for `currency`. Readers see either the previous
    /// record or the new one, never a mix.
    fn replace(&self, currency: &CurrencyCode, levels: &StockLevels) -> Result<()>;

    /// Run `f` with exclusive access to the record for `currency`, waiting
    /// at most `timeout` to obtain it. Access is released on every exit
    /// path of `f`.
    fn exclusive<T, F>(&self, currency: &CurrencyCode, timeout: Duration, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>;
}

/// Store that lives only as long as the process.
///
/// Useful for tests and for embedding the engine where persistence is
/// handled elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<CurrencyCode, StockLevels>>,
    locks: LockTable,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryStore {
    fn read(&self, currency: &CurrencyCode) -> Result<Option<StockLevels>> {
        Ok(self.records.lock().get(currency).cloned())
    }

    fn replace(&self, currency: &CurrencyCode, levels: &StockLevels) -> Result<()> {
        self.records.lock().insert(currency.clone(), levels.clone());
        Ok(())
    }

    fn exclusive<T, F>(&self, currency: &CurrencyCode, timeout: Duration, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        self.locks.with_lock(currency, timeout, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::amount::Amount;

    #[test]
    fn test_memory_store_read_replace() {
        let store = MemoryStore::new();
        let eur = CurrencyCode::new("EUR");
        assert_eq!(store.read(&eur).unwrap(), None);

        let levels: StockLevels = [(Amount::from(100u64), Amount::from(3u64))]
            .into_iter()
            .collect();
        store.replace(&eur, &levels).unwrap();
        assert_eq!(store.read(&eur).unwrap(), Some(levels));
        assert_eq!(store.read(&CurrencyCode::new("USD")).unwrap(), None);
    }
}

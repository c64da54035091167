use crate::config::LedgerConfig;
use crate::core::amount::Amount;
use crate::core::currency::Currency;
use crate::core::stock::StockLevels;
use crate::engine::greedy::{Breakdown, GreedyDecomposer};
use crate::ledger::error::{LedgerError, Result};
use crate::ledger::store::LedgerStore;
use serde::Serialize;
use uuid::Uuid;

/// Outcome of a stock-backed decomposition.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerTransaction {
    /// Identifier logged with the commit; also set for infeasible attempts.
    pub id: Uuid,
    pub feasible: bool,
    /// Units handed out. Empty when not feasible.
    pub breakdown: Breakdown,
    /// What greedy could not cover; zero when feasible.
    pub remainder: Amount,
    /// Stock after the transaction; the untouched stock when not feasible.
    pub stock: StockLevels,
}

/// Persistent inventory of physical denominations, one record per currency.
///
/// The only way to change stock is through [`StockLedger::transact`] or
/// [`StockLedger::restock`], both of which hold the store's exclusive lock
/// for the currency across read, compute and write.
///
/// # Examples
///
/// ```
/// use change_engine::config::LedgerConfig;
/// use change_engine::core::amount::Amount;
/// use change_engine::core::catalog::CurrencyCatalog;
/// use change_engine::ledger::{MemoryStore, StockLedger};
///
/// let catalog = CurrencyCatalog::builtin();
/// let eur = catalog.get("EUR").unwrap();
/// let ledger = StockLedger::new(MemoryStore::new(), LedgerConfig::default());
///
/// let tx = ledger.transact(eur, &Amount::from(376u64)).unwrap();
/// assert!(tx.feasible);
/// assert_eq!(tx.breakdown.total(), Amount::from(376u64));
/// ```
#[derive(Debug)]
pub struct StockLedger<S: LedgerStore> {
    store: S,
    config: LedgerConfig,
}

impl<S: LedgerStore> StockLedger<S> {
    pub fn new(store: S, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Current stock for `currency`, seeding and persisting it first if
    /// the store has no record yet.
    pub fn load(&self, currency: &Currency) -> Result<StockLevels> {
        self.store
            .exclusive(currency.code(), self.config.lock_timeout, || {
                self.read_or_seed(currency)
            })
    }

    /// Give change for `amount` out of the stock of `currency`.
    ///
    /// Runs greedy against a shadow copy of the stock while holding the
    /// currency's lock. If the change is exact, the shadow copy replaces
    /// the durable record before the lock is released; otherwise nothing
    /// is written. A failed write is reported as
    /// [`LedgerError::CommitFailed`] and leaves the previous record intact.
    pub fn transact(&self, currency: &Currency, amount: &Amount) -> Result<LedgerTransaction> {
        let code = currency.code();
        self.store.exclusive(code, self.config.lock_timeout, || {
            let current = self.read_or_seed(currency)?;
            let mut shadow = current.clone();
            let decomposition =
                GreedyDecomposer::limited(amount, currency.denominations(), &mut shadow)?;
            let id = Uuid::new_v4();

            if !decomposition.is_exact() {
                log::debug!(
                    "{}: tx {} cannot give change for {} from stock, {} left over",
                    code,
                    id,
                    amount,
                    decomposition.remainder
                );
                return Ok(LedgerTransaction {
                    id,
                    feasible: false,
                    breakdown: Breakdown::new(),
                    remainder: decomposition.remainder,
                    stock: current,
                });
            }

            self.store.replace(code, &shadow)?;
            log::info!(
                "{}: tx {} gave change for {} in {} unit(s)",
                code,
                id,
                amount,
                decomposition.breakdown.pieces()
            );
            Ok(LedgerTransaction {
                id,
                feasible: true,
                breakdown: decomposition.breakdown,
                remainder: decomposition.remainder,
                stock: shadow,
            })
        })
    }

    /// Replace every count for `currency` with `levels`.
    ///
    /// `levels` must name exactly the currency's denominations; a mismatch
    /// is rejected before the lock is taken.
    pub fn restock(&self, currency: &Currency, levels: StockLevels) -> Result<StockLevels> {
        let code = currency.code();
        if let Err(drift) = levels.check_against(currency) {
            return Err(LedgerError::StockMismatch {
                currency: code.clone(),
                drift: drift.to_string(),
            });
        }
        self.store.exclusive(code, self.config.lock_timeout, || {
            self.store.replace(code, &levels)?;
            log::info!("{}: restocked, total value {}", code, levels.total_value());
            Ok(levels)
        })
    }

    /// Must be called with the currency's lock held.
    fn read_or_seed(&self, currency: &Currency) -> Result<StockLevels> {
        let code = currency.code();
        match self.store.read(code)? {
            Some(levels) => {
                levels
                    .check_against(currency)
                    .map_err(|drift| LedgerError::Corrupt {
                        currency: code.clone(),
                        reason: drift.to_string(),
                    })?;
                Ok(levels)
            }
            None => {
                let seeded = StockLevels::seeded(currency, &self.config.initial_stock);
                self.store.replace(code, &seeded).map_err(|e| match e {
                    LedgerError::CommitFailed { currency, source } => {
                        LedgerError::SeedFailed { currency, source }
                    }
                    other => other,
                })?;
                log::warn!(
                    "{}: no stock record, seeded {} unit(s) of each denomination",
                    code,
                    self.config.initial_stock
                );
                Ok(seeded)
            }
        }
    }
}

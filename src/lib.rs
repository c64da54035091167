//! # change-engine
//!
//! Gives change for an amount using the denominations of a currency.
//!
//! Two modes are supported: *unlimited*, a pure greedy decomposition, and
//! *limited*, where the units handed out come from a persisted stock of
//! each denomination that is debited atomically and under a per-currency
//! lock.
//!
//! ## Architecture
//!
//! - **core** — Amounts, currencies, the currency catalog and stock levels
//! - **engine** — Greedy decomposition and the `compute_change` API
//! - **ledger** — Stock ledger, store abstraction, file store and locking
//! - **config** — Engine and ledger settings

pub mod config;
pub mod core;
pub mod engine;
pub mod ledger;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::config::{EngineConfig, LedgerConfig};
    pub use crate::core::amount::Amount;
    pub use crate::core::catalog::CurrencyCatalog;
    pub use crate::core::currency::{Currency, CurrencyCode};
    pub use crate::core::stock::StockLevels;
    pub use crate::engine::change::{
        ChangeEngine, ChangeError, ChangeMode, ChangeReceipt, ChangeRequest, ErrorKind,
        ValidationError,
    };
    pub use crate::engine::greedy::{Breakdown, Decomposition, GreedyDecomposer};
    pub use crate::ledger::{JsonFileStore, LedgerError, LedgerStore, MemoryStore, StockLedger};
}
